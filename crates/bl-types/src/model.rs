//! Capability traits for the surrogate model.
//!
//! The loop never fits a model itself: it hands data to an implementation of
//! [`SurrogateModel`] and asks it for predictions. Batch strategies that need
//! the slope of the predicted mean additionally require
//! [`DifferentiableModel`].

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Predictive mean and variance at a single input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub mean: f64,
    pub variance: f64,
}

impl Prediction {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    /// Standard deviation, with negative variances from round-off clipped to zero.
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Gradients of the predictive mean and variance with respect to the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionGradients {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
}

/// A single-output surrogate model of the user function.
pub trait SurrogateModel {
    /// Replace the training data.
    fn set_data(&mut self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError>;

    /// Tune the model's hyper-parameters against its current data.
    fn optimize(&mut self) -> Result<(), ModelError>;

    fn predict(&self, x: &[f64]) -> Result<Prediction, ModelError>;

    /// Training inputs currently held by the model.
    fn inputs(&self) -> &[Vec<f64>];

    /// Training targets currently held by the model.
    fn targets(&self) -> &[f64];

    /// Smallest training target, if any data is present.
    fn min_target(&self) -> Option<f64> {
        self.targets()
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::min)
    }
}

/// A model that can also report the gradient of its predictions.
pub trait DifferentiableModel: SurrogateModel {
    fn prediction_gradients(&self, x: &[f64]) -> Result<PredictionGradients, ModelError>;
}
