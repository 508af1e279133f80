//! Batch proposals by local penalization.
//!
//! Each point of a batch maximizes the base acquisition multiplied by one
//! penalizer per point already chosen. A penalizer is the probability that
//! the chosen point is *not* the minimizer's neighbour, given a Lipschitz
//! bound on the objective, so it suppresses the acquisition in a ball around
//! the chosen point whose radius grows with how far the prediction there is
//! from the incumbent. Everything is done in log space, so multiplication
//! becomes addition.
//!
//! González, Dai, Hennig, Lawrence: *Batch Bayesian Optimization via Local
//! Penalization*, AISTATS 2016.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use bl_loop::{AcquisitionOptimizer, CandidatePointCalculator, LoopState};
use bl_types::{
    Acquisition, Candidate, CandidateError, Context, DifferentiableModel, ModelError,
    ParameterSpace, SurrogateModel,
};

use crate::stats::log_normal_cdf;

/// Random samples used to seed the Lipschitz constant search.
pub const LIPSCHITZ_SAMPLES: usize = 500;

/// Gradient evaluations spent refining the best Lipschitz sample.
const LIPSCHITZ_REFINEMENT_EVALUATIONS: usize = 200;

/// Estimates below this mean the model is flat.
const MIN_LIPSCHITZ_CONSTANT: f64 = 1e-7;

/// Used in place of an estimate below [`MIN_LIPSCHITZ_CONSTANT`].
const FALLBACK_LIPSCHITZ_CONSTANT: f64 = 10.0;

/// Floor on the penalizer width, so noiseless predictions stay finite.
const MIN_SCALE: f64 = 1e-10;

// ---- Penalizer ----

/// Sum of log local penalizers around the points chosen so far.
#[derive(Debug, Clone)]
pub struct LocalPenalization {
    lipschitz_constant: f64,
    f_min: f64,
    centres: Vec<Candidate>,
    radii: Vec<f64>,
    scales: Vec<f64>,
}

impl LocalPenalization {
    pub fn new(lipschitz_constant: f64, f_min: f64) -> Self {
        Self {
            lipschitz_constant,
            f_min,
            centres: Vec::new(),
            radii: Vec::new(),
            scales: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.centres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }

    /// Penalize the neighbourhood of `x`.
    pub fn add_point<M>(&mut self, model: &M, x: &[f64]) -> Result<(), ModelError>
    where
        M: SurrogateModel + ?Sized,
    {
        let prediction = model.predict(x)?;
        self.radii
            .push((prediction.mean - self.f_min).abs() / self.lipschitz_constant);
        self.scales
            .push((prediction.std_dev() / self.lipschitz_constant).max(MIN_SCALE));
        self.centres.push(x.to_vec());
        Ok(())
    }

    /// Log of the product of all penalizers at `x`; zero with no points.
    pub fn log_penalty(&self, x: &[f64]) -> f64 {
        self.centres
            .iter()
            .zip(self.radii.iter().zip(&self.scales))
            .map(|(centre, (r, s))| log_normal_cdf((euclidean(x, centre) - r) / s))
            .sum()
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Log of a base acquisition plus a [`LocalPenalization`].
///
/// Acquisitions that can be zero or negative go through a softplus first.
pub struct PenalizedAcquisition<'a, A: ?Sized> {
    base: &'a A,
    penalization: &'a LocalPenalization,
}

impl<'a, A: ?Sized> PenalizedAcquisition<'a, A> {
    pub fn new(base: &'a A, penalization: &'a LocalPenalization) -> Self {
        Self { base, penalization }
    }
}

impl<M, A> Acquisition<M> for PenalizedAcquisition<'_, A>
where
    M: ?Sized,
    A: Acquisition<M> + ?Sized,
{
    fn evaluate(&self, model: &M, x: &[f64]) -> Result<f64, ModelError> {
        let value = self.base.evaluate(model, x)?;
        let positive = if self.base.has_positive_values() {
            value
        } else {
            softplus(value)
        };
        Ok(positive.max(f64::MIN_POSITIVE).ln() + self.penalization.log_penalty(x))
    }

    fn name(&self) -> &str {
        "local_penalization"
    }
}

fn softplus(v: f64) -> f64 {
    if v > 30.0 {
        v
    } else {
        v.exp().ln_1p()
    }
}

// ---- Lipschitz constant ----

/// Largest norm of the predicted mean's gradient over `space`.
///
/// Starts from the best of `samples` uniform draws and the model's own
/// training inputs, then refines with a bounded compass search over the
/// continuous dimensions. Flat models get a fallback constant.
pub fn estimate_lipschitz_constant<M, R>(
    space: &ParameterSpace,
    model: &M,
    samples: usize,
    rng: &mut R,
) -> Result<f64, CandidateError>
where
    M: DifferentiableModel + ?Sized,
    R: Rng + ?Sized,
{
    let gradient_norm = |x: &[f64]| -> Result<f64, ModelError> {
        let gradients = model.prediction_gradients(x)?;
        Ok(gradients.mean.iter().map(|g| g * g).sum::<f64>().sqrt())
    };

    space.check()?;
    let dims = space.dimensionality();
    let mut starts = space.sample(rng, samples);
    starts.extend(model.inputs().iter().filter(|x| x.len() == dims).cloned());

    let mut best: Option<(Candidate, f64)> = None;
    for x in starts {
        let norm = gradient_norm(&x)?;
        if norm.is_finite() && best.as_ref().map_or(true, |(_, b)| norm > *b) {
            best = Some((x, norm));
        }
    }
    let Some((mut x, mut norm)) = best else {
        return Ok(FALLBACK_LIPSCHITZ_CONSTANT);
    };

    let bounds = space.bounds();
    let free: Vec<usize> = (0..dims)
        .filter(|&d| space.parameters[d].kind.is_continuous())
        .collect();
    let mut step = 0.1;
    let mut spent = 0;
    'search: while step > 1e-4 {
        let mut improved = false;
        for &d in &free {
            let (low, high) = bounds[d];
            for direction in [1.0, -1.0] {
                if spent >= LIPSCHITZ_REFINEMENT_EVALUATIONS {
                    break 'search;
                }
                let mut trial = x.clone();
                trial[d] = (trial[d] + direction * step * (high - low)).clamp(low, high);
                if trial[d] == x[d] {
                    continue;
                }
                spent += 1;
                let trial_norm = gradient_norm(&trial)?;
                if trial_norm.is_finite() && trial_norm > norm {
                    x = trial;
                    norm = trial_norm;
                    improved = true;
                }
            }
        }
        if !improved {
            step *= 0.5;
        }
    }

    if norm < MIN_LIPSCHITZ_CONSTANT {
        debug!(
            "Lipschitz estimate {:e} below minimum, using {}",
            norm, FALLBACK_LIPSCHITZ_CONSTANT
        );
        return Ok(FALLBACK_LIPSCHITZ_CONSTANT);
    }
    Ok(norm)
}

// ---- Calculator ----

/// Proposes `batch_size` points per call by local penalization.
#[derive(Debug, Clone)]
pub struct LocalPenalizationPointCalculator<A, O> {
    acquisition: A,
    optimizer: O,
    space: ParameterSpace,
    batch_size: usize,
    lipschitz_samples: usize,
    rng: ChaCha8Rng,
}

impl<A, O> LocalPenalizationPointCalculator<A, O> {
    pub fn new(acquisition: A, optimizer: O, space: ParameterSpace, batch_size: usize) -> Self {
        Self {
            acquisition,
            optimizer,
            space,
            batch_size,
            lipschitz_samples: LIPSCHITZ_SAMPLES,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_lipschitz_samples(mut self, samples: usize) -> Self {
        self.lipschitz_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }
}

impl<M, A, O> CandidatePointCalculator<M> for LocalPenalizationPointCalculator<A, O>
where
    M: DifferentiableModel,
    A: Acquisition<M>,
    O: AcquisitionOptimizer,
{
    fn compute_next_points(
        &mut self,
        model: &M,
        _state: &LoopState,
        context: &Context,
    ) -> Result<Vec<Candidate>, CandidateError> {
        if self.batch_size == 0 {
            return Err(CandidateError::InvalidBatchSize { batch_size: 0 });
        }
        self.space.check()?;

        // The model is fixed for the whole batch, so are these.
        let f_min = model.min_target().ok_or(ModelError::NoData)?;
        let lipschitz =
            estimate_lipschitz_constant(&self.space, model, self.lipschitz_samples, &mut self.rng)?;
        debug!(
            "Local penalization batch of {} (L = {:.4}, f_min = {:.6})",
            self.batch_size, lipschitz, f_min
        );

        let mut penalization = LocalPenalization::new(lipschitz, f_min);
        let mut batch = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let penalized = PenalizedAcquisition::new(&self.acquisition, &penalization);
            let (x, _) = self
                .optimizer
                .optimize(&penalized, model, &self.space, context)?;
            penalization.add_point(model, &x)?;
            batch.push(x);
        }
        Ok(batch)
    }

    fn name(&self) -> &str {
        "local_penalization"
    }
}
