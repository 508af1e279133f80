//! Acquisition functions for minimization.
//!
//! All three read the incumbent (the smallest target the model was trained on)
//! and the model's predictive mean and standard deviation at the query point.

use serde::{Deserialize, Serialize};

use bl_types::{Acquisition, ModelError, SurrogateModel};

use crate::stats::{normal_cdf, normal_pdf};

/// Standard deviations below this are treated as a noiseless prediction.
const MIN_STD: f64 = 1e-12;

fn incumbent<M: SurrogateModel + ?Sized>(model: &M) -> Result<f64, ModelError> {
    model.min_target().ok_or(ModelError::NoData)
}

// ---- Expected improvement ----

/// Expected amount by which an evaluation at `x` beats the incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpectedImprovement {
    /// Required margin of improvement; larger values explore more.
    pub jitter: f64,
}

impl ExpectedImprovement {
    pub fn new(jitter: f64) -> Self {
        Self { jitter }
    }
}

impl<M: SurrogateModel + ?Sized> Acquisition<M> for ExpectedImprovement {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        let y_min = incumbent(model)?;
        let prediction = model.predict(x)?;
        let std = prediction.std_dev();
        let improvement = y_min - prediction.mean - self.jitter;
        if std < MIN_STD {
            return Ok(improvement.max(0.0));
        }
        let u = improvement / std;
        Ok(std * (u * normal_cdf(u) + normal_pdf(u)))
    }

    fn has_positive_values(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "expected_improvement"
    }
}

// ---- Probability of improvement ----

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbabilityOfImprovement {
    pub jitter: f64,
}

impl ProbabilityOfImprovement {
    pub fn new(jitter: f64) -> Self {
        Self { jitter }
    }
}

impl<M: SurrogateModel + ?Sized> Acquisition<M> for ProbabilityOfImprovement {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        let y_min = incumbent(model)?;
        let prediction = model.predict(x)?;
        let std = prediction.std_dev();
        let improvement = y_min - prediction.mean - self.jitter;
        if std < MIN_STD {
            return Ok(if improvement > 0.0 { 1.0 } else { 0.0 });
        }
        Ok(normal_cdf(improvement / std))
    }

    fn has_positive_values(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "probability_of_improvement"
    }
}

// ---- Lower confidence bound ----

/// `-(mean - beta * std)`: the negated lower confidence bound, so that larger
/// is better like every other acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegativeLowerConfidenceBound {
    pub beta: f64,
}

impl NegativeLowerConfidenceBound {
    pub fn new(beta: f64) -> Self {
        Self { beta }
    }
}

impl Default for NegativeLowerConfidenceBound {
    fn default() -> Self {
        Self { beta: 1.0 }
    }
}

impl<M: SurrogateModel + ?Sized> Acquisition<M> for NegativeLowerConfidenceBound {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        let prediction = model.predict(x)?;
        Ok(-(prediction.mean - self.beta * prediction.std_dev()))
    }

    fn name(&self) -> &str {
        "negative_lower_confidence_bound"
    }
}

// ---- Configuration-time selection ----

/// Acquisition chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcquisitionKind {
    ExpectedImprovement {
        #[serde(default)]
        jitter: f64,
    },
    ProbabilityOfImprovement {
        #[serde(default)]
        jitter: f64,
    },
    NegativeLowerConfidenceBound {
        beta: f64,
    },
}

impl Default for AcquisitionKind {
    fn default() -> Self {
        AcquisitionKind::ExpectedImprovement { jitter: 0.0 }
    }
}

impl<M: SurrogateModel + ?Sized> Acquisition<M> for AcquisitionKind {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        match *self {
            AcquisitionKind::ExpectedImprovement { jitter } => {
                ExpectedImprovement::new(jitter).evaluate(model, x)
            }
            AcquisitionKind::ProbabilityOfImprovement { jitter } => {
                ProbabilityOfImprovement::new(jitter).evaluate(model, x)
            }
            AcquisitionKind::NegativeLowerConfidenceBound { beta } => {
                NegativeLowerConfidenceBound::new(beta).evaluate(model, x)
            }
        }
    }

    fn has_positive_values(&self) -> bool {
        !matches!(self, AcquisitionKind::NegativeLowerConfidenceBound { .. })
    }

    fn name(&self) -> &str {
        match self {
            AcquisitionKind::ExpectedImprovement { .. } => "expected_improvement",
            AcquisitionKind::ProbabilityOfImprovement { .. } => "probability_of_improvement",
            AcquisitionKind::NegativeLowerConfidenceBound { .. } => {
                "negative_lower_confidence_bound"
            }
        }
    }
}
