//! Acquisition function capability.

use crate::errors::ModelError;

/// Scores how useful it would be to evaluate the user function at `x`.
///
/// Larger is better; acquisition optimizers maximize this value.
pub trait Acquisition<M: ?Sized> {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError>;

    /// Whether every value this acquisition returns is strictly positive.
    ///
    /// Batch strategies that combine acquisitions multiplicatively use this to
    /// decide whether a positivity transform is needed first.
    fn has_positive_values(&self) -> bool {
        false
    }

    /// Human-readable acquisition name.
    fn name(&self) -> &str;
}

impl<M: ?Sized, A: Acquisition<M> + ?Sized> Acquisition<M> for &A {
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        (**self).evaluate(model, x)
    }

    fn has_positive_values(&self) -> bool {
        (**self).has_positive_values()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
