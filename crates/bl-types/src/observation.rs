//! Observations produced by evaluating the user function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A proposed input awaiting evaluation.
pub type Candidate = Vec<f64>;

/// Parameter name to the value it is fixed to while computing candidates.
pub type Context = BTreeMap<String, f64>;

/// One evaluated input with its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
    /// Named auxiliary outputs, e.g. evaluation cost.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_outputs: BTreeMap<String, Vec<f64>>,
}

/// Name used by the rest of the loop for a single evaluation result.
pub type UserFunctionResult = Observation;

impl Observation {
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> Self {
        Self {
            input,
            output,
            extra_outputs: BTreeMap::new(),
        }
    }

    pub fn with_extra_output(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.extra_outputs.insert(name.into(), values);
        self
    }

    /// The first output, which single-objective models are fit against.
    pub fn objective(&self) -> Option<f64> {
        self.output.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_outputs_are_kept_by_name() {
        let obs = Observation::new(vec![0.5, 1.0], vec![3.0])
            .with_extra_output("cost", vec![12.0]);
        assert_eq!(obs.objective(), Some(3.0));
        assert_eq!(obs.extra_outputs.get("cost"), Some(&vec![12.0]));
    }

    #[test]
    fn empty_extras_are_not_serialized() {
        let obs = Observation::new(vec![1.0], vec![2.0]);
        let json = serde_json::to_string(&obs).unwrap();
        assert!(!json.contains("extra_outputs"));

        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
    }
}
