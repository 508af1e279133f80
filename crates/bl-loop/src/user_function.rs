//! Uniform evaluation interface over the function being optimized.

use std::fmt::Display;

use tracing::debug;

use bl_types::{Candidate, EvaluationError, Observation};

/// The function (or experiment) the loop is optimizing.
pub trait UserFunction {
    /// Evaluate every input, returning one observation per input in order.
    fn evaluate(&mut self, inputs: &[Candidate]) -> Result<Vec<Observation>, EvaluationError>;

    /// Human-readable function name.
    fn name(&self) -> &str;
}

impl<T: UserFunction + ?Sized> UserFunction for &mut T {
    fn evaluate(&mut self, inputs: &[Candidate]) -> Result<Vec<Observation>, EvaluationError> {
        (**self).evaluate(inputs)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wraps a closure that evaluates a whole batch at once.
///
/// The closure receives every candidate and must return one output row per
/// candidate, in the same order.
pub struct UserFunctionWrapper<F> {
    name: String,
    f: F,
    evaluations: usize,
}

impl<F, E> UserFunctionWrapper<F>
where
    F: FnMut(&[Candidate]) -> Result<Vec<Vec<f64>>, E>,
    E: Display,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            evaluations: 0,
        }
    }

    /// Number of points evaluated so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl<F, E> UserFunction for UserFunctionWrapper<F>
where
    F: FnMut(&[Candidate]) -> Result<Vec<Vec<f64>>, E>,
    E: Display,
{
    fn evaluate(&mut self, inputs: &[Candidate]) -> Result<Vec<Observation>, EvaluationError> {
        if inputs.is_empty() {
            return Err(EvaluationError::EmptyBatch {
                function: self.name.clone(),
            });
        }

        let outputs = (self.f)(inputs).map_err(|e| EvaluationError::Failed {
            function: self.name.clone(),
            message: e.to_string(),
        })?;

        if outputs.len() != inputs.len() {
            return Err(EvaluationError::CardinalityMismatch {
                function: self.name.clone(),
                expected: inputs.len(),
                actual: outputs.len(),
            });
        }

        let observations = pair_outputs(&self.name, inputs, outputs)?;
        self.evaluations += observations.len();
        debug!("Evaluated {} points with {}", observations.len(), self.name);
        Ok(observations)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wraps a closure that evaluates one point at a time.
pub struct PointwiseFunction<F> {
    name: String,
    f: F,
    evaluations: usize,
}

impl<F, E> PointwiseFunction<F>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
    E: Display,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            evaluations: 0,
        }
    }

    /// Number of points evaluated so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl<F, E> UserFunction for PointwiseFunction<F>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
    E: Display,
{
    fn evaluate(&mut self, inputs: &[Candidate]) -> Result<Vec<Observation>, EvaluationError> {
        if inputs.is_empty() {
            return Err(EvaluationError::EmptyBatch {
                function: self.name.clone(),
            });
        }

        // The whole batch fails on the first error; a partial batch is never returned.
        let outputs = inputs
            .iter()
            .map(|x| (self.f)(x.as_slice()))
            .collect::<Result<Vec<_>, E>>()
            .map_err(|e| EvaluationError::Failed {
                function: self.name.clone(),
                message: e.to_string(),
            })?;

        let observations = pair_outputs(&self.name, inputs, outputs)?;
        self.evaluations += observations.len();
        debug!("Evaluated {} points with {}", observations.len(), self.name);
        Ok(observations)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn pair_outputs(
    name: &str,
    inputs: &[Candidate],
    outputs: Vec<Vec<f64>>,
) -> Result<Vec<Observation>, EvaluationError> {
    inputs
        .iter()
        .zip(outputs)
        .enumerate()
        .map(|(index, (input, output))| {
            if output.is_empty() {
                return Err(EvaluationError::EmptyOutput {
                    function: name.to_string(),
                    index,
                });
            }
            Ok(Observation::new(input.clone(), output))
        })
        .collect()
}
