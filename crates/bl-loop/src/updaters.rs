//! Policies for feeding loop data back into the surrogate model.

use tracing::debug;

use bl_types::{LoopError, LoopResult, ModelError, SurrogateModel};

use crate::loop_state::LoopState;

/// Updates a model from the current loop state.
///
/// Calling `update` more than once for the same state must be harmless.
pub trait ModelUpdater<M> {
    /// Returns `true` when the model was refit.
    fn update(&mut self, model: &mut M, state: &LoopState) -> Result<bool, ModelError>;
}

/// Extracts model targets from the loop state.
pub type TargetsExtractor = fn(&LoopState) -> Vec<f64>;

/// Default targets: the first output of every observation.
pub fn first_output(state: &LoopState) -> Vec<f64> {
    state
        .observations()
        .iter()
        .map(|o| o.objective().unwrap_or(f64::NAN))
        .collect()
}

/// Refits the model every `interval` iterations.
#[derive(Debug, Clone)]
pub struct FixedIntervalUpdater<T = TargetsExtractor> {
    interval: usize,
    targets: T,
}

impl FixedIntervalUpdater {
    /// Refit every `interval` iterations against the first output.
    pub fn new(interval: usize) -> LoopResult<Self> {
        Self::with_targets(interval, first_output)
    }
}

impl<T: Fn(&LoopState) -> Vec<f64>> FixedIntervalUpdater<T> {
    pub fn with_targets(interval: usize, targets: T) -> LoopResult<Self> {
        if interval == 0 {
            return Err(LoopError::Validation(
                "model update interval must be at least 1".into(),
            ));
        }
        Ok(Self { interval, targets })
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl<M, T> ModelUpdater<M> for FixedIntervalUpdater<T>
where
    M: SurrogateModel,
    T: Fn(&LoopState) -> Vec<f64>,
{
    fn update(&mut self, model: &mut M, state: &LoopState) -> Result<bool, ModelError> {
        if state.iteration() % self.interval != 0 {
            return Ok(false);
        }

        let targets = (self.targets)(state);
        model.set_data(&state.x(), &targets)?;
        model.optimize()?;
        debug!(
            "Refit model on {} observations at iteration {}",
            state.len(),
            state.iteration()
        );
        Ok(true)
    }
}

/// Leaves the model untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModelUpdater;

impl<M> ModelUpdater<M> for NoopModelUpdater {
    fn update(&mut self, _model: &mut M, _state: &LoopState) -> Result<bool, ModelError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_types::{Observation, Prediction};

    #[derive(Default)]
    struct Recorder {
        inputs: Vec<Vec<f64>>,
        targets: Vec<f64>,
        fits: usize,
        fail: bool,
    }

    impl SurrogateModel for Recorder {
        fn set_data(&mut self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
            self.inputs = inputs.to_vec();
            self.targets = targets.to_vec();
            Ok(())
        }

        fn optimize(&mut self) -> Result<(), ModelError> {
            if self.fail {
                return Err(ModelError::FitFailed {
                    message: "cholesky failed".into(),
                });
            }
            self.fits += 1;
            Ok(())
        }

        fn predict(&self, _x: &[f64]) -> Result<Prediction, ModelError> {
            Ok(Prediction::new(0.0, 1.0))
        }

        fn inputs(&self) -> &[Vec<f64>] {
            &self.inputs
        }

        fn targets(&self) -> &[f64] {
            &self.targets
        }
    }

    fn state_with(iteration: usize) -> LoopState {
        let mut state = LoopState::new(vec![Observation::new(vec![0.0], vec![1.0, 7.0])]).unwrap();
        for i in 0..iteration {
            state
                .update(vec![Observation::new(vec![i as f64 + 1.0], vec![2.0, 8.0])])
                .unwrap();
        }
        state
    }

    #[test]
    fn refits_on_interval_only() {
        let mut updater = FixedIntervalUpdater::new(2).unwrap();
        let mut model = Recorder::default();

        assert!(updater.update(&mut model, &state_with(0)).unwrap());
        assert!(!updater.update(&mut model, &state_with(1)).unwrap());
        assert!(updater.update(&mut model, &state_with(2)).unwrap());
        assert_eq!(model.fits, 2);
        assert_eq!(model.inputs.len(), 3);
        assert_eq!(model.targets, vec![1.0, 2.0, 2.0]);
    }

    #[test]
    fn custom_targets_extractor() {
        let mut updater =
            FixedIntervalUpdater::with_targets(1, |state: &LoopState| -> Vec<f64> {
                state.y().iter().map(|row| row[1]).collect()
            })
            .unwrap();
        let mut model = Recorder::default();
        updater.update(&mut model, &state_with(1)).unwrap();
        assert_eq!(model.targets, vec![7.0, 8.0]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            FixedIntervalUpdater::new(0),
            Err(LoopError::Validation(_))
        ));
    }

    #[test]
    fn fit_failure_is_reported() {
        let mut updater = FixedIntervalUpdater::new(1).unwrap();
        let mut model = Recorder {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            updater.update(&mut model, &state_with(0)),
            Err(ModelError::FitFailed { .. })
        ));
    }

    #[test]
    fn noop_never_refits() {
        let mut model = Recorder::default();
        assert!(!NoopModelUpdater.update(&mut model, &state_with(3)).unwrap());
        assert!(model.inputs.is_empty());
    }
}
