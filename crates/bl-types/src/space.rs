//! Input domain definitions for the user function.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{CandidateError, LoopError, LoopResult};
use crate::observation::{Candidate, Context};

/// A single input dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Human-readable parameter name (e.g. "learning_rate").
    pub name: String,
    /// The kind of range the parameter takes values from.
    pub kind: ParameterKind,
}

/// Describes the values a parameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous range [low, high].
    Continuous { low: f64, high: f64 },
    /// Integer range [low, high] inclusive, encoded as f64.
    Integer { low: i64, high: i64 },
    /// A finite set of admissible values.
    Discrete { values: Vec<f64> },
}

impl ParameterKind {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Self::Continuous { low, high } => value >= *low && value <= *high,
            Self::Integer { low, high } => {
                value.fract() == 0.0 && value >= *low as f64 && value <= *high as f64
            }
            Self::Discrete { values } => values.iter().any(|v| *v == value),
        }
    }

    /// Closest admissible value to `value`.
    pub fn project(&self, value: f64) -> f64 {
        match self {
            Self::Continuous { low, high } => value.clamp(*low, *high),
            Self::Integer { low, high } => value.round().clamp(*low as f64, *high as f64),
            Self::Discrete { values } => values
                .iter()
                .copied()
                .min_by(|a, b| {
                    (a - value)
                        .abs()
                        .partial_cmp(&(b - value).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(value),
        }
    }

    /// Uniform draw from the parameter's values.
    ///
    /// Panics on an inverted range or an empty value list; see
    /// [`ParameterSpace::check`].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Continuous { low, high } => rng.gen_range(*low..=*high),
            Self::Integer { low, high } => rng.gen_range(*low..=*high) as f64,
            Self::Discrete { values } => values[rng.gen_range(0..values.len())],
        }
    }

    /// Lower and upper bound of the parameter.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Continuous { low, high } => (*low, *high),
            Self::Integer { low, high } => (*low as f64, *high as f64),
            Self::Discrete { values } => values.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(*v), hi.max(*v)),
            ),
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous { .. })
    }
}

/// The full input domain: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    pub parameters: Vec<ParameterDef>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_continuous(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Continuous { low, high },
        });
        self
    }

    pub fn add_integer(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Integer { low, high },
        });
        self
    }

    pub fn add_discrete(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Discrete { values },
        });
        self
    }

    pub fn dimensionality(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Check that every parameter describes a usable, non-degenerate range.
    pub fn validate(&self) -> LoopResult<()> {
        self.check().map_err(|e| LoopError::Validation(e.to_string()))
    }

    /// [`validate`](Self::validate) in the error type of candidate calculators.
    ///
    /// Sampling a space that fails this check panics, so every calculator
    /// runs it before drawing points.
    pub fn check(&self) -> Result<(), CandidateError> {
        if self.parameters.is_empty() {
            return Err(CandidateError::EmptySpace);
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(CandidateError::InvalidSpace {
                    message: format!("duplicate parameter name: {}", param.name),
                });
            }
            let valid = match &param.kind {
                ParameterKind::Continuous { low, high } => {
                    low.is_finite() && high.is_finite() && low < high
                }
                ParameterKind::Integer { low, high } => low <= high,
                ParameterKind::Discrete { values } => {
                    !values.is_empty() && values.iter().all(|v| v.is_finite())
                }
            };
            if !valid {
                return Err(CandidateError::InvalidSpace {
                    message: format!(
                        "parameter {} has an invalid range: {:?}",
                        param.name, param.kind
                    ),
                });
            }
        }
        Ok(())
    }

    /// Whether `x` has the right dimension and every coordinate is admissible.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.parameters.len()
            && self
                .parameters
                .iter()
                .zip(x)
                .all(|(param, v)| param.kind.contains(*v))
    }

    /// Snap every coordinate of `x` to its closest admissible value.
    pub fn project(&self, x: &mut [f64]) {
        for (param, v) in self.parameters.iter().zip(x.iter_mut()) {
            *v = param.kind.project(*v);
        }
    }

    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(|p| p.kind.bounds()).collect()
    }

    /// Translate a named context into `(dimension, value)` pairs.
    pub fn resolve_context(&self, context: &Context) -> Result<Vec<(usize, f64)>, CandidateError> {
        context
            .iter()
            .map(|(name, value)| {
                let index = self.index_of(name).ok_or_else(|| {
                    CandidateError::UnknownContextParameter { name: name.clone() }
                })?;
                if !self.parameters[index].kind.contains(*value) {
                    return Err(CandidateError::ContextOutOfDomain {
                        name: name.clone(),
                        value: *value,
                    });
                }
                Ok((index, *value))
            })
            .collect()
    }

    /// Uniform sample with the `fixed` dimensions overwritten.
    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R, fixed: &[(usize, f64)]) -> Candidate {
        let mut x: Candidate = self
            .parameters
            .iter()
            .map(|param| param.kind.sample(rng))
            .collect();
        for &(index, value) in fixed {
            x[index] = value;
        }
        x
    }

    /// `count` independent uniform samples, e.g. an initial random design.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Candidate> {
        (0..count).map(|_| self.sample_one(rng, &[])).collect()
    }
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_space() -> ParameterSpace {
        ParameterSpace::new()
            .add_continuous("x1", -5.0, 10.0)
            .add_integer("layers", 1, 4)
            .add_discrete("batch", vec![16.0, 32.0, 64.0])
    }

    #[test]
    fn samples_respect_bounds() {
        let space = sample_space();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples = space.sample(&mut rng, 200);
        assert_eq!(samples.len(), 200);
        for x in &samples {
            assert!(space.contains(x), "sample out of domain: {x:?}");
        }
    }

    #[test]
    fn projection_snaps_to_domain() {
        let space = sample_space();
        let mut x = vec![12.0, 2.6, 40.0];
        space.project(&mut x);
        assert_eq!(x, vec![10.0, 3.0, 32.0]);
        assert!(space.contains(&x));
    }

    #[test]
    fn context_resolves_to_indices() {
        let space = sample_space();
        let mut context = Context::new();
        context.insert("batch".to_string(), 64.0);
        assert_eq!(space.resolve_context(&context).unwrap(), vec![(2, 64.0)]);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fixed = space.resolve_context(&context).unwrap();
        for _ in 0..20 {
            assert_eq!(space.sample_one(&mut rng, &fixed)[2], 64.0);
        }
    }

    #[test]
    fn context_errors_are_reported() {
        let space = sample_space();

        let mut unknown = Context::new();
        unknown.insert("momentum".to_string(), 0.9);
        assert_eq!(
            space.resolve_context(&unknown),
            Err(CandidateError::UnknownContextParameter {
                name: "momentum".to_string()
            })
        );

        let mut outside = Context::new();
        outside.insert("layers".to_string(), 9.0);
        assert!(matches!(
            space.resolve_context(&outside),
            Err(CandidateError::ContextOutOfDomain { .. })
        ));
    }

    #[test]
    fn validate_rejects_degenerate_ranges() {
        assert!(sample_space().validate().is_ok());
        assert!(ParameterSpace::new().validate().is_err());
        assert!(ParameterSpace::new()
            .add_continuous("x", 1.0, 1.0)
            .validate()
            .is_err());
        assert!(ParameterSpace::new()
            .add_continuous("x", 0.0, 1.0)
            .add_integer("x", 0, 3)
            .validate()
            .is_err());
        assert!(ParameterSpace::new()
            .add_discrete("d", vec![])
            .validate()
            .is_err());
    }

    #[test]
    fn check_reports_candidate_errors() {
        assert!(sample_space().check().is_ok());
        assert_eq!(ParameterSpace::new().check(), Err(CandidateError::EmptySpace));
        assert!(matches!(
            ParameterSpace::new().add_continuous("x", 1.0, 0.0).check(),
            Err(CandidateError::InvalidSpace { .. })
        ));
        assert!(matches!(
            ParameterSpace::new().add_integer("n", 3, 1).check(),
            Err(CandidateError::InvalidSpace { .. })
        ));
        match ParameterSpace::new().add_discrete("d", vec![]).validate() {
            Err(LoopError::Validation(message)) => assert!(message.contains("parameter d")),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn discrete_bounds_span_values() {
        let kind = ParameterKind::Discrete {
            values: vec![4.0, -1.0, 2.5],
        };
        assert_eq!(kind.bounds(), (-1.0, 4.0));
    }
}
