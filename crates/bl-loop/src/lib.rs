//! # bl-loop
//!
//! The decision-making loop of bayesloop.
//!
//! Provides the loop state, the user-function abstraction, the outer loop,
//! stopping conditions, model-update policies and candidate-point
//! calculators, all exported from this one namespace.

mod candidates;
mod config;
mod events;
mod loop_state;
mod optimizer;
mod outer_loop;
mod stopping;
mod updaters;
mod user_function;

pub use candidates::{CandidatePointCalculator, RandomSampling, Sequential};
pub use config::LoopConfig;
pub use events::{IterationEvent, IterationEvents, LoopId};
pub use loop_state::LoopState;
pub use optimizer::{AcquisitionOptimizer, OptimizerConfig, RandomSearchOptimizer};
pub use outer_loop::{LoopPhase, LoopSummary, OuterLoop};
pub use stopping::{
    And, ConvergenceStoppingCondition, FixedIterationsStoppingCondition, Or, StoppingCondition,
    StoppingConditionExt, StoppingRule,
};
pub use updaters::{
    first_output, FixedIntervalUpdater, ModelUpdater, NoopModelUpdater, TargetsExtractor,
};
pub use user_function::{PointwiseFunction, UserFunction, UserFunctionWrapper};

pub use bl_types::{
    Acquisition, Candidate, CandidateError, Context, DifferentiableModel, EvaluationError,
    LoopError, LoopResult, ModelError, Observation, ParameterDef, ParameterKind, ParameterSpace,
    Prediction, PredictionGradients, StateError, SurrogateModel, UserFunctionResult,
};
