//! # bl-bayesopt
//!
//! Bayesian optimization on top of the bayesloop outer loop: acquisition
//! functions, the local-penalization batch calculator, a ready-made
//! optimization loop and a couple of benchmark objectives.
//!
//! ```ignore
//! let (branin, space) = branin_function();
//! let config = BayesOptConfig::default().with_batch_size(10);
//! let mut bo = bayesian_optimization_loop(model, space, initial_state, &config)?;
//! bo.run_for(branin, 5)?;
//! ```

pub mod acquisition;
pub mod bo_loop;
pub mod local_penalization;
pub mod stats;
pub mod test_functions;

pub use acquisition::{
    AcquisitionKind, ExpectedImprovement, NegativeLowerConfidenceBound, ProbabilityOfImprovement,
};
pub use bo_loop::{
    bayesian_optimization_loop, BayesOptCalculator, BayesOptConfig, BayesianOptimizationLoop,
};
pub use local_penalization::{
    estimate_lipschitz_constant, LocalPenalization, LocalPenalizationPointCalculator,
    PenalizedAcquisition,
};
pub use test_functions::{
    branin, branin_function, branin_space, forrester, forrester_function, forrester_space,
    DimensionError, TestFunction,
};
