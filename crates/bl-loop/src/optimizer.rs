//! Maximization of acquisition functions over the parameter space.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bl_types::{Acquisition, Candidate, CandidateError, Context, ParameterSpace};

/// Smallest relative step the compass search will try.
const MIN_STEP_FRACTION: f64 = 1e-4;

/// Finds the input that maximizes an acquisition.
pub trait AcquisitionOptimizer {
    /// Returns the best input found and its acquisition value.
    ///
    /// Parameters named in `context` keep their fixed value.
    fn optimize<M, A>(
        &mut self,
        acquisition: &A,
        model: &M,
        space: &ParameterSpace,
        context: &Context,
    ) -> Result<(Candidate, f64), CandidateError>
    where
        M: ?Sized,
        A: Acquisition<M> + ?Sized;
}

/// Settings for [`RandomSearchOptimizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Uniform samples drawn before refinement.
    pub num_samples: usize,
    /// Maximum acquisition evaluations spent refining the best sample.
    pub refinement_steps: usize,
    /// Seed for reproducible runs; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            refinement_steps: 100,
            seed: None,
        }
    }
}

/// Random sampling followed by a compass search over continuous dimensions.
#[derive(Debug, Clone)]
pub struct RandomSearchOptimizer {
    config: OptimizerConfig,
    rng: ChaCha8Rng,
}

impl RandomSearchOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl Default for RandomSearchOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl AcquisitionOptimizer for RandomSearchOptimizer {
    fn optimize<M, A>(
        &mut self,
        acquisition: &A,
        model: &M,
        space: &ParameterSpace,
        context: &Context,
    ) -> Result<(Candidate, f64), CandidateError>
    where
        M: ?Sized,
        A: Acquisition<M> + ?Sized,
    {
        space.check()?;
        let fixed = space.resolve_context(context)?;

        let samples = self.config.num_samples.max(1);
        let mut best: Option<(Candidate, f64)> = None;
        for _ in 0..samples {
            let x = space.sample_one(&mut self.rng, &fixed);
            let value = acquisition.evaluate(model, &x)?;
            if value.is_finite() && best.as_ref().map_or(true, |(_, b)| value > *b) {
                best = Some((x, value));
            }
        }
        let (mut x, mut value) =
            best.ok_or(CandidateError::NoFiniteValue { evaluations: samples })?;

        let free: Vec<usize> = space
            .parameters
            .iter()
            .enumerate()
            .filter(|(i, p)| p.kind.is_continuous() && fixed.iter().all(|(f, _)| f != i))
            .map(|(i, _)| i)
            .collect();
        let bounds = space.bounds();

        let mut step = 0.1;
        let mut spent = 0;
        'search: while step > MIN_STEP_FRACTION {
            let mut improved = false;
            for &d in &free {
                let (low, high) = bounds[d];
                for direction in [1.0, -1.0] {
                    if spent >= self.config.refinement_steps {
                        break 'search;
                    }
                    let mut trial = x.clone();
                    trial[d] = (trial[d] + direction * step * (high - low)).clamp(low, high);
                    if trial[d] == x[d] {
                        continue;
                    }
                    spent += 1;
                    let trial_value = acquisition.evaluate(model, &trial)?;
                    if trial_value.is_finite() && trial_value > value {
                        x = trial;
                        value = trial_value;
                        improved = true;
                    }
                }
            }
            if !improved {
                step *= 0.5;
            }
        }

        debug!(
            "Acquisition {} maximized at {:?} (value {:.6}, {} refinement evaluations)",
            acquisition.name(),
            x,
            value,
            spent
        );
        Ok((x, value))
    }
}
