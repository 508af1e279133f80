//! Strategies that propose the next points to evaluate.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use bl_types::{Acquisition, Candidate, CandidateError, Context, ParameterSpace};

use crate::loop_state::LoopState;
use crate::optimizer::AcquisitionOptimizer;

/// Proposes the next input(s) given the model and the loop history.
pub trait CandidatePointCalculator<M> {
    fn compute_next_points(
        &mut self,
        model: &M,
        state: &LoopState,
        context: &Context,
    ) -> Result<Vec<Candidate>, CandidateError>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

// ---- Sequential ----

/// Proposes exactly one point per call: the acquisition maximizer.
#[derive(Debug, Clone)]
pub struct Sequential<A, O> {
    acquisition: A,
    optimizer: O,
    space: ParameterSpace,
}

impl<A, O> Sequential<A, O> {
    pub fn new(acquisition: A, optimizer: O, space: ParameterSpace) -> Self {
        Self {
            acquisition,
            optimizer,
            space,
        }
    }

    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }
}

impl<M, A, O> CandidatePointCalculator<M> for Sequential<A, O>
where
    A: Acquisition<M>,
    O: AcquisitionOptimizer,
{
    fn compute_next_points(
        &mut self,
        model: &M,
        _state: &LoopState,
        context: &Context,
    ) -> Result<Vec<Candidate>, CandidateError> {
        let (x, _) = self
            .optimizer
            .optimize(&self.acquisition, model, &self.space, context)?;
        Ok(vec![x])
    }

    fn name(&self) -> &str {
        "sequential"
    }
}

// ---- Random sampling ----

/// Model-free uniform sampling of the parameter space.
#[derive(Debug, Clone)]
pub struct RandomSampling {
    space: ParameterSpace,
    batch_size: usize,
    rng: ChaCha8Rng,
}

impl RandomSampling {
    pub fn new(space: ParameterSpace) -> Self {
        Self {
            space,
            batch_size: 1,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }
}

impl<M> CandidatePointCalculator<M> for RandomSampling {
    fn compute_next_points(
        &mut self,
        _model: &M,
        _state: &LoopState,
        context: &Context,
    ) -> Result<Vec<Candidate>, CandidateError> {
        if self.batch_size == 0 {
            return Err(CandidateError::InvalidBatchSize { batch_size: 0 });
        }
        self.space.check()?;
        let fixed = self.space.resolve_context(context)?;
        Ok((0..self.batch_size)
            .map(|_| self.space.sample_one(&mut self.rng, &fixed))
            .collect())
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{OptimizerConfig, RandomSearchOptimizer};
    use bl_types::ModelError;

    /// Acquisition that prefers inputs close to the model's target value.
    struct Closeness;

    impl Acquisition<f64> for Closeness {
        fn evaluate(&self, model: &f64, x: &[f64]) -> Result<f64, ModelError> {
            Ok(-(x[0] - model).abs())
        }

        fn name(&self) -> &str {
            "closeness"
        }
    }

    fn line() -> ParameterSpace {
        ParameterSpace::new().add_continuous("x", -1.0, 1.0)
    }

    #[test]
    fn sequential_yields_exactly_one_candidate() {
        let optimizer = RandomSearchOptimizer::new(OptimizerConfig {
            num_samples: 50,
            refinement_steps: 50,
            seed: Some(3),
        });
        let mut calculator = Sequential::new(Closeness, optimizer, line());
        let state = LoopState::empty();

        for target in [-0.5, 0.0, 0.25, 0.9] {
            let points = calculator
                .compute_next_points(&target, &state, &Context::new())
                .unwrap();
            assert_eq!(points.len(), 1);
            assert!((points[0][0] - target).abs() < 0.05);
        }
    }

    #[test]
    fn random_sampling_batch_and_context() {
        let space = ParameterSpace::new()
            .add_continuous("x", 0.0, 1.0)
            .add_integer("n", 1, 3);
        let mut calculator = RandomSampling::new(space.clone())
            .with_batch_size(4)
            .with_seed(11);
        let mut context = Context::new();
        context.insert("n".to_string(), 2.0);

        let points = CandidatePointCalculator::<()>::compute_next_points(
            &mut calculator,
            &(),
            &LoopState::empty(),
            &context,
        )
        .unwrap();
        assert_eq!(points.len(), 4);
        for x in &points {
            assert!(space.contains(x));
            assert_eq!(x[1], 2.0);
        }
    }

    #[test]
    fn random_sampling_rejects_bad_context() {
        let mut calculator = RandomSampling::new(line()).with_seed(1);
        let mut context = Context::new();
        context.insert("y".to_string(), 0.0);
        let err = CandidatePointCalculator::<()>::compute_next_points(
            &mut calculator,
            &(),
            &LoopState::empty(),
            &context,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CandidateError::UnknownContextParameter {
                name: "y".to_string()
            }
        );
    }

    #[test]
    fn random_sampling_rejects_unusable_spaces() {
        let spaces = [
            ParameterSpace::new().add_continuous("x", 1.0, 0.0),
            ParameterSpace::new().add_discrete("d", vec![]),
        ];
        for space in spaces {
            let mut calculator = RandomSampling::new(space).with_seed(2);
            let err = CandidatePointCalculator::<()>::compute_next_points(
                &mut calculator,
                &(),
                &LoopState::empty(),
                &Context::new(),
            )
            .unwrap_err();
            assert!(matches!(err, CandidateError::InvalidSpace { .. }), "{err:?}");
        }
    }
}
