//! Accumulated history of the loop.

use serde::{Deserialize, Serialize};

use bl_types::{LoopResult, Observation, StateError};

/// Observations gathered so far plus the number of completed iterations.
///
/// The history is append-only: observations are never removed or rewritten
/// once recorded, and the iteration counter only moves forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopState {
    observations: Vec<Observation>,
    iteration: usize,
}

impl LoopState {
    /// State seeded with previously gathered observations, at iteration 0.
    ///
    /// Fails if the observations disagree on input or output dimension.
    pub fn new(observations: Vec<Observation>) -> Result<Self, StateError> {
        let mut state = Self::empty();
        state.append(observations)?;
        Ok(state)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Initial state built from paired input and output rows.
    pub fn from_arrays(x: Vec<Vec<f64>>, y: Vec<Vec<f64>>) -> Result<Self, StateError> {
        if x.len() != y.len() {
            return Err(StateError::ShapeMismatch {
                inputs: x.len(),
                outputs: y.len(),
            });
        }
        let observations = x
            .into_iter()
            .zip(y)
            .map(|(input, output)| Observation::new(input, output))
            .collect();
        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.observations.first().map(|o| o.input.len())
    }

    pub fn output_dim(&self) -> Option<usize> {
        self.observations.first().map(|o| o.output.len())
    }

    /// All inputs, one row per observation.
    pub fn x(&self) -> Vec<Vec<f64>> {
        self.observations.iter().map(|o| o.input.clone()).collect()
    }

    /// All outputs, one row per observation.
    pub fn y(&self) -> Vec<Vec<f64>> {
        self.observations.iter().map(|o| o.output.clone()).collect()
    }

    /// Rows of a named extra output, if every observation carries it.
    pub fn extra_output(&self, name: &str) -> Option<Vec<Vec<f64>>> {
        if self.observations.is_empty() {
            return None;
        }
        self.observations
            .iter()
            .map(|o| o.extra_outputs.get(name).cloned())
            .collect()
    }

    /// Observation with the smallest first output.
    pub fn best_observation(&self) -> Option<&Observation> {
        self.observations
            .iter()
            .filter(|o| o.objective().is_some_and(f64::is_finite))
            .min_by(|a, b| {
                a.output[0]
                    .partial_cmp(&b.output[0])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Record new observations without completing an iteration.
    ///
    /// The whole batch is validated before anything is recorded, so a
    /// rejected batch leaves the state unchanged.
    pub fn append(&mut self, results: Vec<Observation>) -> Result<(), StateError> {
        let mut dims = self.input_dim().zip(self.output_dim());
        for obs in &results {
            match dims {
                Some((input_dim, output_dim)) => {
                    if obs.input.len() != input_dim {
                        return Err(StateError::InputDimension {
                            expected: input_dim,
                            actual: obs.input.len(),
                        });
                    }
                    if obs.output.len() != output_dim {
                        return Err(StateError::OutputDimension {
                            expected: output_dim,
                            actual: obs.output.len(),
                        });
                    }
                }
                None => dims = Some((obs.input.len(), obs.output.len())),
            }
        }
        self.observations.extend(results);
        Ok(())
    }

    /// Mark one more iteration as completed.
    pub fn advance(&mut self) {
        self.iteration += 1;
    }

    /// Record the results of one completed iteration.
    pub fn update(&mut self, results: Vec<Observation>) -> Result<(), StateError> {
        self.append(results)?;
        self.advance();
        Ok(())
    }

    pub fn to_json(&self) -> LoopResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a checkpoint, re-checking dimensional consistency.
    pub fn from_json(json: &str) -> LoopResult<Self> {
        #[derive(Deserialize)]
        struct Raw {
            observations: Vec<Observation>,
            iteration: usize,
        }

        let raw: Raw = serde_json::from_str(json)?;
        let mut state = Self::new(raw.observations)?;
        state.iteration = raw.iteration;
        Ok(state)
    }
}
