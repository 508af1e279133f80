//! Loop configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use bl_types::{LoopError, LoopResult, ParameterSpace};

use crate::candidates::RandomSampling;
use crate::optimizer::{OptimizerConfig, RandomSearchOptimizer};
use crate::stopping::StoppingRule;
use crate::updaters::FixedIntervalUpdater;

/// Top-level configuration for an outer loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub name: String,

    /// Iteration counter value at which the loop stops.
    pub max_iterations: usize,

    /// Also stop once consecutive inputs are closer than this.
    pub convergence_tolerance: Option<f64>,

    /// Refit the model every this many iterations.
    pub model_update_interval: usize,

    /// Seed for the random components built from this config; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            name: "outer_loop".to_string(),
            max_iterations: 20,
            convergence_tolerance: None,
            model_update_interval: 1,
            seed: None,
        }
    }
}

impl LoopConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_convergence_tolerance(mut self, eps: f64) -> Self {
        self.convergence_tolerance = Some(eps);
        self
    }

    pub fn with_model_update_interval(mut self, interval: usize) -> Self {
        self.model_update_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> LoopResult<()> {
        if self.model_update_interval == 0 {
            return Err(LoopError::Config(
                "model_update_interval must be at least 1".into(),
            ));
        }
        if let Some(eps) = self.convergence_tolerance {
            if !(eps.is_finite() && eps > 0.0) {
                return Err(LoopError::Config(format!(
                    "convergence_tolerance must be positive and finite, got {eps}"
                )));
            }
        }
        Ok(())
    }

    /// The stopping condition this configuration describes.
    pub fn stopping_rule(&self) -> StoppingRule {
        let fixed = StoppingRule::FixedIterations {
            max_iterations: self.max_iterations,
        };
        match self.convergence_tolerance {
            Some(eps) => StoppingRule::Any {
                rules: vec![fixed, StoppingRule::Convergence { eps }],
            },
            None => fixed,
        }
    }

    pub fn model_updater(&self) -> LoopResult<FixedIntervalUpdater> {
        FixedIntervalUpdater::new(self.model_update_interval)
    }

    /// Uniform sampling of `space`, seeded from this config.
    pub fn random_sampling(&self, space: ParameterSpace, batch_size: usize) -> RandomSampling {
        let sampling = RandomSampling::new(space).with_batch_size(batch_size);
        match self.seed {
            Some(seed) => sampling.with_seed(seed),
            None => sampling,
        }
    }

    /// Acquisition optimizer that falls back to this config's seed.
    pub fn acquisition_optimizer(&self, mut optimizer: OptimizerConfig) -> RandomSearchOptimizer {
        if optimizer.seed.is_none() {
            optimizer.seed = self.seed;
        }
        RandomSearchOptimizer::new(optimizer)
    }

    pub fn from_json_str(json: &str) -> LoopResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> LoopResult<Self> {
        let path = path.as_ref();
        debug!("Loading loop config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
