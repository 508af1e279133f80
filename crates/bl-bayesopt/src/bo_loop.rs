//! Bayesian optimization assembled from the generic outer loop.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use bl_loop::{
    CandidatePointCalculator, FixedIntervalUpdater, LoopState, OptimizerConfig, OuterLoop,
    RandomSearchOptimizer, Sequential,
};
use bl_types::{
    Candidate, CandidateError, Context, DifferentiableModel, LoopError, LoopResult,
    ParameterSpace,
};

use crate::acquisition::AcquisitionKind;
use crate::local_penalization::{LocalPenalizationPointCalculator, LIPSCHITZ_SAMPLES};

/// Settings for [`bayesian_optimization_loop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesOptConfig {
    /// Points proposed per iteration; above one, batches use local penalization.
    pub batch_size: usize,

    pub acquisition: AcquisitionKind,

    pub optimizer: OptimizerConfig,

    /// Random samples seeding each Lipschitz constant estimate.
    pub lipschitz_samples: usize,

    /// Seeds every random component not seeded on its own.
    pub seed: Option<u64>,
}

impl Default for BayesOptConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            acquisition: AcquisitionKind::default(),
            optimizer: OptimizerConfig::default(),
            lipschitz_samples: LIPSCHITZ_SAMPLES,
            seed: None,
        }
    }
}

impl BayesOptConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_acquisition(mut self, acquisition: AcquisitionKind) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_lipschitz_samples(mut self, samples: usize) -> Self {
        self.lipschitz_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> LoopResult<()> {
        if self.batch_size == 0 {
            return Err(LoopError::Config("batch_size must be at least 1".into()));
        }
        if self.optimizer.num_samples == 0 {
            return Err(LoopError::Config(
                "optimizer.num_samples must be at least 1".into(),
            ));
        }
        if let AcquisitionKind::NegativeLowerConfidenceBound { beta } = self.acquisition {
            if !(beta.is_finite() && beta >= 0.0) {
                return Err(bl_types::config_error!(
                    "acquisition beta must be non-negative and finite, got {}",
                    beta
                ));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> LoopResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> LoopResult<Self> {
        let path = path.as_ref();
        debug!("Loading Bayesian optimization config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Candidate calculator for this configuration over `space`.
    pub fn calculator(&self, space: ParameterSpace) -> BayesOptCalculator {
        let mut optimizer_config = self.optimizer.clone();
        if optimizer_config.seed.is_none() {
            optimizer_config.seed = self.seed;
        }
        let optimizer = RandomSearchOptimizer::new(optimizer_config);

        if self.batch_size == 1 {
            return BayesOptCalculator::Sequential(Sequential::new(
                self.acquisition,
                optimizer,
                space,
            ));
        }
        let mut calculator = LocalPenalizationPointCalculator::new(
            self.acquisition,
            optimizer,
            space,
            self.batch_size,
        )
        .with_lipschitz_samples(self.lipschitz_samples);
        if let Some(seed) = self.seed {
            calculator = calculator.with_seed(seed.wrapping_add(1));
        }
        BayesOptCalculator::LocalPenalization(calculator)
    }
}

/// Sequential for single-point iterations, local penalization for batches.
#[derive(Debug, Clone)]
pub enum BayesOptCalculator {
    Sequential(Sequential<AcquisitionKind, RandomSearchOptimizer>),
    LocalPenalization(LocalPenalizationPointCalculator<AcquisitionKind, RandomSearchOptimizer>),
}

impl<M: DifferentiableModel> CandidatePointCalculator<M> for BayesOptCalculator {
    fn compute_next_points(
        &mut self,
        model: &M,
        state: &LoopState,
        context: &Context,
    ) -> Result<Vec<Candidate>, CandidateError> {
        match self {
            BayesOptCalculator::Sequential(c) => c.compute_next_points(model, state, context),
            BayesOptCalculator::LocalPenalization(c) => {
                c.compute_next_points(model, state, context)
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            BayesOptCalculator::Sequential(c) => CandidatePointCalculator::<M>::name(c),
            BayesOptCalculator::LocalPenalization(c) => CandidatePointCalculator::<M>::name(c),
        }
    }
}

/// Outer loop that minimizes a user function with a surrogate model.
pub type BayesianOptimizationLoop<M> = OuterLoop<M, BayesOptCalculator, FixedIntervalUpdater>;

/// Bayesian optimization over `space`, starting from `initial_state`.
///
/// The model is refit after every iteration on the first output column.
pub fn bayesian_optimization_loop<M>(
    model: M,
    space: ParameterSpace,
    initial_state: LoopState,
    config: &BayesOptConfig,
) -> LoopResult<BayesianOptimizationLoop<M>>
where
    M: DifferentiableModel,
{
    config.validate()?;
    space.validate()?;
    let calculator = config.calculator(space);
    info!(
        "Bayesian optimization with {} (batch size {}), {} initial observations",
        CandidatePointCalculator::<M>::name(&calculator),
        config.batch_size,
        initial_state.len()
    );
    let updater = FixedIntervalUpdater::new(1)?;
    Ok(OuterLoop::new(model, calculator, updater)
        .with_loop_state(initial_state)
        .with_name("bayesian_optimization"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn batch_size_selects_the_calculator() {
        let space = ParameterSpace::new().add_continuous("x", 0.0, 1.0);
        let config = BayesOptConfig::default();
        assert!(matches!(
            config.calculator(space.clone()),
            BayesOptCalculator::Sequential(_)
        ));

        let config = config.with_batch_size(5).with_seed(3);
        match config.calculator(space) {
            BayesOptCalculator::LocalPenalization(c) => {
                assert_eq!(c.batch_size(), 5);
                assert_eq!(*c.acquisition(), AcquisitionKind::default());
            }
            other => panic!("expected local penalization, got {other:?}"),
        }
    }

    #[test]
    fn validation() {
        assert!(BayesOptConfig::default().validate().is_ok());
        assert!(matches!(
            BayesOptConfig::default().with_batch_size(0).validate(),
            Err(LoopError::Config(_))
        ));
        let lcb = AcquisitionKind::NegativeLowerConfidenceBound { beta: -1.0 };
        assert!(matches!(
            BayesOptConfig::default().with_acquisition(lcb).validate(),
            Err(LoopError::Config(_))
        ));
    }

    #[test]
    fn parse_from_json() {
        let config = BayesOptConfig::from_json_str(
            r#"{
                "batch_size": 4,
                "acquisition": {"kind": "probability_of_improvement", "jitter": 0.01},
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(
            config.acquisition,
            AcquisitionKind::ProbabilityOfImprovement { jitter: 0.01 }
        );
        assert_eq!(config.optimizer, OptimizerConfig::default());
        assert_eq!(config.lipschitz_samples, LIPSCHITZ_SAMPLES);

        assert!(matches!(
            BayesOptConfig::from_json_str(r#"{"batch_size": 0}"#),
            Err(LoopError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 2, "lipschitz_samples": 50}}"#).unwrap();
        let config = BayesOptConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.lipschitz_samples, 50);
    }
}
