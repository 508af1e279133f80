#![allow(dead_code)]

use bl_bayesopt::test_functions::Objective;
use bl_loop::{
    DifferentiableModel, LoopState, ModelError, ParameterSpace, Prediction, PredictionGradients,
    SurrogateModel,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `count` seeded uniform samples of `space`, evaluated with `objective`.
pub fn initial_design(
    space: &ParameterSpace,
    objective: Objective,
    count: usize,
    seed: u64,
) -> LoopState {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = space.sample(&mut rng, count);
    let y = x
        .iter()
        .map(|xi| objective(xi).unwrap())
        .collect();
    LoopState::from_arrays(x, y).unwrap()
}

/// Nadaraya-Watson regression with a Gaussian kernel.
///
/// Variance shrinks with the total kernel weight near the query point, so it
/// is largest far from the data. `optimize` picks the length scale as the mean
/// nearest-neighbour distance of the training inputs.
#[derive(Debug, Clone)]
pub struct KernelRegression {
    inputs: Vec<Vec<f64>>,
    targets: Vec<f64>,
    length_scale: f64,
    signal_variance: f64,
    pub fits: usize,
}

impl KernelRegression {
    pub fn new(length_scale: f64) -> Self {
        Self {
            inputs: Vec::new(),
            targets: Vec::new(),
            length_scale,
            signal_variance: 1.0,
            fits: 0,
        }
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Exponents of the kernel weights, their maximum, and the mean.
    fn weights(&self, x: &[f64]) -> Result<(Vec<f64>, f64, f64), ModelError> {
        if self.inputs.is_empty() {
            return Err(ModelError::NoData);
        }
        if x.len() != self.inputs[0].len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.inputs[0].len(),
                actual: x.len(),
            });
        }
        let l2 = self.length_scale * self.length_scale;
        let exponents: Vec<f64> = self
            .inputs
            .iter()
            .map(|xi| -squared_distance(x, xi) / (2.0 * l2))
            .collect();
        let max = exponents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let relative: Vec<f64> = exponents.iter().map(|e| (e - max).exp()).collect();
        let total: f64 = relative.iter().sum();
        let mean = relative
            .iter()
            .zip(&self.targets)
            .map(|(w, y)| w * y)
            .sum::<f64>()
            / total;
        Ok((relative, max, mean))
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q).powi(2)).sum()
}

impl SurrogateModel for KernelRegression {
    fn set_data(&mut self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
        if inputs.len() != targets.len() {
            return Err(ModelError::DataMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        self.inputs = inputs.to_vec();
        self.targets = targets.to_vec();
        Ok(())
    }

    fn optimize(&mut self) -> Result<(), ModelError> {
        let n = self.targets.len();
        if n == 0 {
            return Err(ModelError::NoData);
        }
        let mean = self.targets.iter().sum::<f64>() / n as f64;
        let variance = self.targets.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n as f64;
        self.signal_variance = variance.max(1e-6);

        if n > 1 {
            let nearest: f64 = self
                .inputs
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    self.inputs
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, b)| squared_distance(a, b).sqrt())
                        .fold(f64::INFINITY, f64::min)
                })
                .sum::<f64>()
                / n as f64;
            if nearest.is_finite() && nearest > 1e-6 {
                self.length_scale = nearest;
            }
        }
        self.fits += 1;
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction, ModelError> {
        let (relative, max, mean) = self.weights(x)?;
        let total = max.exp() * relative.iter().sum::<f64>();
        let variance = self.signal_variance / (1.0 + total);
        Ok(Prediction::new(mean, variance))
    }

    fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    fn targets(&self) -> &[f64] {
        &self.targets
    }
}

impl DifferentiableModel for KernelRegression {
    fn prediction_gradients(&self, x: &[f64]) -> Result<PredictionGradients, ModelError> {
        let (relative, max, mean) = self.weights(x)?;
        let l2 = self.length_scale * self.length_scale;
        let normaliser: f64 = relative.iter().sum();
        let scale = max.exp();
        let total = scale * normaliser;

        let mut d_mean = vec![0.0; x.len()];
        let mut d_total = vec![0.0; x.len()];
        for ((xi, yi), w) in self.inputs.iter().zip(&self.targets).zip(&relative) {
            for d in 0..x.len() {
                // d w_i / d x = -w_i (x - x_i) / l^2
                let dw = -w * (x[d] - xi[d]) / l2;
                d_mean[d] += dw * (yi - mean) / normaliser;
                d_total[d] += scale * dw;
            }
        }
        let d_variance = d_total
            .iter()
            .map(|dt| -self.signal_variance * dt / (1.0 + total).powi(2))
            .collect();
        Ok(PredictionGradients {
            mean: d_mean,
            variance: d_variance,
        })
    }
}
