//! Stopping conditions for the outer loop.

use serde::{Deserialize, Serialize};

use crate::loop_state::LoopState;

/// Decides whether the loop should stop collecting points.
///
/// Implementations must be pure checks over the state: asking twice about
/// the same state gives the same answer.
pub trait StoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool;
}

impl<S: StoppingCondition + ?Sized> StoppingCondition for &S {
    fn should_stop(&self, state: &LoopState) -> bool {
        (**self).should_stop(state)
    }
}

/// Stops once the iteration counter reaches a fixed bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIterationsStoppingCondition {
    pub max_iterations: usize,
}

impl FixedIterationsStoppingCondition {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl StoppingCondition for FixedIterationsStoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool {
        state.iteration() >= self.max_iterations
    }
}

/// Stops once the two most recent inputs are closer than `eps`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceStoppingCondition {
    pub eps: f64,
}

impl ConvergenceStoppingCondition {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }
}

impl StoppingCondition for ConvergenceStoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool {
        let observations = state.observations();
        if observations.len() < 2 {
            return false;
        }
        let last = &observations[observations.len() - 1].input;
        let previous = &observations[observations.len() - 2].input;
        let distance = last
            .iter()
            .zip(previous)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        distance < self.eps
    }
}

/// Stops when either condition says so.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Or<A, B>(pub A, pub B);

impl<A: StoppingCondition, B: StoppingCondition> StoppingCondition for Or<A, B> {
    fn should_stop(&self, state: &LoopState) -> bool {
        self.0.should_stop(state) || self.1.should_stop(state)
    }
}

/// Stops only when both conditions say so.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct And<A, B>(pub A, pub B);

impl<A: StoppingCondition, B: StoppingCondition> StoppingCondition for And<A, B> {
    fn should_stop(&self, state: &LoopState) -> bool {
        self.0.should_stop(state) && self.1.should_stop(state)
    }
}

/// Combinators available on every stopping condition.
pub trait StoppingConditionExt: StoppingCondition + Sized {
    fn or<B: StoppingCondition>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn and<B: StoppingCondition>(self, other: B) -> And<Self, B> {
        And(self, other)
    }
}

impl<S: StoppingCondition> StoppingConditionExt for S {}

/// Stopping condition chosen from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoppingRule {
    FixedIterations { max_iterations: usize },
    Convergence { eps: f64 },
    /// Stops as soon as any of the inner rules does.
    Any { rules: Vec<StoppingRule> },
    /// Stops once every inner rule does.
    All { rules: Vec<StoppingRule> },
}

impl StoppingCondition for StoppingRule {
    fn should_stop(&self, state: &LoopState) -> bool {
        match self {
            Self::FixedIterations { max_iterations } => {
                FixedIterationsStoppingCondition::new(*max_iterations).should_stop(state)
            }
            Self::Convergence { eps } => ConvergenceStoppingCondition::new(*eps).should_stop(state),
            Self::Any { rules } => rules.iter().any(|rule| rule.should_stop(state)),
            Self::All { rules } => {
                !rules.is_empty() && rules.iter().all(|rule| rule.should_stop(state))
            }
        }
    }
}
