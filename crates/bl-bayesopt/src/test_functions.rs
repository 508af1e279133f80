//! Standard benchmark objectives with their domains.

use std::f64::consts::PI;
use thiserror::Error;

use bl_loop::{ParameterSpace, PointwiseFunction};

/// A benchmark was called with the wrong number of coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{function} takes {expected} coordinates, got {actual}")]
pub struct DimensionError {
    pub function: &'static str,
    pub expected: usize,
    pub actual: usize,
}

pub type Objective = fn(&[f64]) -> Result<Vec<f64>, DimensionError>;

/// Benchmark objective usable directly as a user function.
pub type TestFunction = PointwiseFunction<Objective>;

/// Branin-Hoo on `x1 in [-5, 10]`, `x2 in [0, 15]`.
///
/// Three global minima of about 0.397887, at `(-pi, 12.275)`,
/// `(pi, 2.275)` and `(9.42478, 2.475)`.
///
/// Panics when `x` has fewer than two coordinates; [`branin_function`]
/// reports that as an error instead.
pub fn branin(x: &[f64]) -> f64 {
    let (a, r, s) = (1.0, 6.0, 10.0);
    let b = 5.1 / (4.0 * PI * PI);
    let c = 5.0 / PI;
    let t = 1.0 / (8.0 * PI);
    let (x1, x2) = (x[0], x[1]);
    a * (x2 - b * x1 * x1 + c * x1 - r).powi(2) + s * (1.0 - t) * x1.cos() + s
}

pub fn branin_space() -> ParameterSpace {
    ParameterSpace::new()
        .add_continuous("x1", -5.0, 10.0)
        .add_continuous("x2", 0.0, 15.0)
}

pub fn branin_function() -> (TestFunction, ParameterSpace) {
    fn evaluate(x: &[f64]) -> Result<Vec<f64>, DimensionError> {
        check_dimension("branin", 2, x)?;
        Ok(vec![branin(x)])
    }
    let objective: Objective = evaluate;
    (PointwiseFunction::new("branin", objective), branin_space())
}

/// Forrester et al. (2008) on `x in [0, 1]`; minimum about -6.02074 at 0.75725.
///
/// Panics on an empty `x`; [`forrester_function`] reports that as an error.
pub fn forrester(x: &[f64]) -> f64 {
    let x = x[0];
    (6.0 * x - 2.0).powi(2) * (12.0 * x - 4.0).sin()
}

pub fn forrester_space() -> ParameterSpace {
    ParameterSpace::new().add_continuous("x", 0.0, 1.0)
}

pub fn forrester_function() -> (TestFunction, ParameterSpace) {
    fn evaluate(x: &[f64]) -> Result<Vec<f64>, DimensionError> {
        check_dimension("forrester", 1, x)?;
        Ok(vec![forrester(x)])
    }
    let objective: Objective = evaluate;
    (PointwiseFunction::new("forrester", objective), forrester_space())
}

fn check_dimension(
    function: &'static str,
    expected: usize,
    x: &[f64],
) -> Result<(), DimensionError> {
    if x.len() != expected {
        return Err(DimensionError {
            function,
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}
