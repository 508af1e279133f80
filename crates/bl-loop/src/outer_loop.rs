//! The outer loop: propose, evaluate, record, update, until told to stop.
//!
//! The loop can be used in two modes:
//!
//! 1. [`OuterLoop::run_loop`] computes candidates, evaluates the user function
//!    at them and records the results until a [`StoppingCondition`] fires.
//! 2. [`OuterLoop::get_next_points`] only computes candidates; the caller runs
//!    the experiment and hands the results back on the next call.

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bl_types::{
    Candidate, Context, EvaluationError, LoopResult, ModelError, Observation, SurrogateModel,
};

use crate::candidates::CandidatePointCalculator;
use crate::config::LoopConfig;
use crate::events::{IterationEvent, IterationEvents, LoopId};
use crate::loop_state::LoopState;
use crate::stopping::{FixedIterationsStoppingCondition, StoppingCondition};
use crate::updaters::{FixedIntervalUpdater, ModelUpdater};
use crate::user_function::UserFunction;

/// Lifecycle state of an outer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPhase {
    /// Created, never run.
    Idle,
    /// Inside `run_loop`, or waiting for ask/tell results.
    Running,
    /// The last run ended because its stopping condition fired.
    Stopped,
    /// The last run or ask/tell step ended with an error.
    Failed,
}

/// Outcome of one call to [`OuterLoop::run_loop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub loop_id: LoopId,
    pub name: String,
    pub phase: LoopPhase,
    /// Iterations completed during this run.
    pub iterations_run: usize,
    /// Iteration counter at the end of the run.
    pub total_iterations: usize,
    pub observations_added: usize,
    pub total_observations: usize,
    pub best: Option<Observation>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Orchestrates candidate calculation, evaluation and model updates.
///
/// The loop owns the model: calculators read it, updaters refit it, and
/// nothing else touches it while a run is in progress.
pub struct OuterLoop<M, C, U> {
    id: LoopId,
    name: String,
    model: M,
    calculator: C,
    updaters: Vec<U>,
    state: LoopState,
    phase: LoopPhase,
    last_error: Option<String>,
    /// `(observations, iteration)` the models were last updated with.
    synced: Option<(usize, usize)>,
    events: IterationEvents,
}

impl<M, C> OuterLoop<M, C, FixedIntervalUpdater>
where
    M: SurrogateModel,
    C: CandidatePointCalculator<M>,
{
    /// Loop named after `config` that refits every `model_update_interval`
    /// iterations.
    ///
    /// Seed `calculator` with [`LoopConfig::random_sampling`] or
    /// [`LoopConfig::acquisition_optimizer`] to make the run reproducible.
    pub fn from_config(model: M, calculator: C, config: &LoopConfig) -> LoopResult<Self> {
        config.validate()?;
        let updater = config.model_updater()?;
        Ok(Self::new(model, calculator, updater).with_name(config.name.clone()))
    }
}

impl<M, C, U> OuterLoop<M, C, U>
where
    C: CandidatePointCalculator<M>,
    U: ModelUpdater<M>,
{
    pub fn new(model: M, calculator: C, updater: U) -> Self {
        Self::with_updaters(model, calculator, vec![updater])
    }

    /// Loop that runs every updater, in order, whenever models are updated.
    pub fn with_updaters(model: M, calculator: C, updaters: Vec<U>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "outer_loop".to_string(),
            model,
            calculator,
            updaters,
            state: LoopState::empty(),
            phase: LoopPhase::Idle,
            last_error: None,
            synced: None,
            events: IterationEvents::new(),
        }
    }

    /// Start from previously gathered observations.
    pub fn with_loop_state(mut self, state: LoopState) -> Self {
        self.state = state;
        self.synced = None;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Message of the error that ended the last failed run or ask/tell step.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable model access; the next cycle refreshes the model from the state.
    pub fn model_mut(&mut self) -> &mut M {
        self.synced = None;
        &mut self.model
    }

    pub fn calculator(&self) -> &C {
        &self.calculator
    }

    /// Receive an [`IterationEvent`] after every completed iteration.
    pub fn subscribe(&mut self) -> Receiver<IterationEvent> {
        self.events.subscribe()
    }

    pub fn into_parts(self) -> (M, LoopState) {
        (self.model, self.state)
    }

    /// Run until `stopping` fires, evaluating `user_function` at every
    /// proposed candidate.
    ///
    /// Parameters named in `context` are held at their given value while
    /// candidates are computed.
    pub fn run_loop<F, S>(
        &mut self,
        mut user_function: F,
        stopping: S,
        context: &Context,
    ) -> LoopResult<LoopSummary>
    where
        F: UserFunction,
        S: StoppingCondition,
    {
        info!(
            "Starting outer loop {} ({}) with {} observations",
            self.name,
            self.id,
            self.state.len()
        );
        let started_at = Utc::now();
        let start_iteration = self.state.iteration();
        let start_observations = self.state.len();
        self.phase = LoopPhase::Running;
        self.last_error = None;

        if let Err(e) = self.run_cycles(&mut user_function, &stopping, context) {
            warn!("Outer loop {} failed: {}", self.name, e);
            self.phase = LoopPhase::Failed;
            self.last_error = Some(e.to_string());
            return Err(e);
        }

        self.phase = LoopPhase::Stopped;
        let summary = LoopSummary {
            loop_id: self.id,
            name: self.name.clone(),
            phase: self.phase,
            iterations_run: self.state.iteration() - start_iteration,
            total_iterations: self.state.iteration(),
            observations_added: self.state.len() - start_observations,
            total_observations: self.state.len(),
            best: self.state.best_observation().cloned(),
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Finished outer loop {} after {} iterations ({} observations)",
            self.name, summary.iterations_run, summary.total_observations
        );
        Ok(summary)
    }

    /// Run exactly `iterations` more iterations, whatever the current counter.
    ///
    /// `usize::MAX` runs until the user function or the model fails.
    pub fn run_for<F>(&mut self, user_function: F, iterations: usize) -> LoopResult<LoopSummary>
    where
        F: UserFunction,
    {
        let bound = self.state.iteration().saturating_add(iterations);
        let stopping = FixedIterationsStoppingCondition::new(bound);
        self.run_loop(user_function, stopping, &Context::new())
    }

    /// Ask/tell mode: record the caller's `results`, then propose the next
    /// candidates without evaluating them.
    pub fn get_next_points(&mut self, results: Vec<Observation>) -> LoopResult<Vec<Candidate>> {
        self.get_next_points_with_context(results, &Context::new())
    }

    /// Failures are recorded in [`phase`](Self::phase) and
    /// [`last_error`](Self::last_error) as for `run_loop`.
    pub fn get_next_points_with_context(
        &mut self,
        results: Vec<Observation>,
        context: &Context,
    ) -> LoopResult<Vec<Candidate>> {
        match self.ask_tell_step(results, context) {
            Ok(candidates) => {
                self.phase = LoopPhase::Running;
                self.last_error = None;
                Ok(candidates)
            }
            Err(e) => {
                warn!("Outer loop {} failed in ask/tell mode: {}", self.name, e);
                self.phase = LoopPhase::Failed;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn ask_tell_step(
        &mut self,
        results: Vec<Observation>,
        context: &Context,
    ) -> LoopResult<Vec<Candidate>> {
        if results.is_empty() {
            self.sync_models()?;
        } else {
            self.state.update(results)?;
            self.update_models()?;
        }
        let candidates = self
            .calculator
            .compute_next_points(&self.model, &self.state, context)?;
        debug!(
            "Proposed {} candidates at iteration {}",
            candidates.len(),
            self.state.iteration()
        );
        Ok(candidates)
    }

    fn run_cycles<F, S>(
        &mut self,
        user_function: &mut F,
        stopping: &S,
        context: &Context,
    ) -> LoopResult<()>
    where
        F: UserFunction,
        S: StoppingCondition,
    {
        while !stopping.should_stop(&self.state) {
            info!("Iteration {}", self.state.iteration());

            self.sync_models()?;
            let candidates = self
                .calculator
                .compute_next_points(&self.model, &self.state, context)?;
            let results = user_function.evaluate(&candidates)?;
            if results.len() != candidates.len() {
                return Err(EvaluationError::CardinalityMismatch {
                    function: user_function.name().to_string(),
                    expected: candidates.len(),
                    actual: results.len(),
                }
                .into());
            }

            let added = results.len();
            self.state.update(results)?;
            self.publish_iteration_end(added);
            self.update_models()?;
        }
        Ok(())
    }

    /// Update models only if the state changed since they last saw it.
    fn sync_models(&mut self) -> Result<(), ModelError> {
        let current = (self.state.len(), self.state.iteration());
        if self.state.is_empty() || self.synced == Some(current) {
            return Ok(());
        }
        self.update_models()
    }

    fn update_models(&mut self) -> Result<(), ModelError> {
        for updater in &mut self.updaters {
            updater.update(&mut self.model, &self.state)?;
        }
        self.synced = Some((self.state.len(), self.state.iteration()));
        Ok(())
    }

    fn publish_iteration_end(&mut self, added: usize) {
        if !self.events.has_subscribers() {
            return;
        }
        let observations = self.state.observations();
        let event = IterationEvent {
            loop_id: self.id,
            iteration: self.state.iteration(),
            new_observations: observations[observations.len() - added..].to_vec(),
            total_observations: observations.len(),
            best_objective: self.state.best_observation().and_then(Observation::objective),
            timestamp: Utc::now(),
        };
        self.events.publish(&event);
    }
}
