//! Standard normal distribution helpers used by the acquisitions.

use std::f64::consts::{PI, SQRT_2};

/// Standard normal PDF.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Natural log of the standard normal CDF, accurate far into the lower tail.
pub fn log_normal_cdf(x: f64) -> f64 {
    if x < 0.0 {
        (0.5f64).ln() + ln_erfc_nonneg(-x / SQRT_2)
    } else {
        (-0.5 * erfc(x / SQRT_2)).ln_1p()
    }
}

/// Complementary error function (Chebyshev fit, fractional error below 1.2e-7).
pub fn erfc(x: f64) -> f64 {
    let r = ln_erfc_nonneg(x.abs()).exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// `ln(erfc(z))` for `z >= 0`, evaluated without forming `erfc` itself.
fn ln_erfc_nonneg(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    t.ln() - z * z + poly
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_reference_values() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.0) - 0.841_344_746).abs() < 1e-6);
        assert!((normal_cdf(-1.96) - 0.024_997_895).abs() < 1e-6);
        assert!((normal_pdf(0.0) - 0.398_942_280).abs() < 1e-9);
    }

    #[test]
    fn log_cdf_stays_finite_in_the_tail() {
        assert!((log_normal_cdf(0.0) - 0.5f64.ln()).abs() < 1e-7);
        assert!((log_normal_cdf(2.0) - normal_cdf(2.0).ln()).abs() < 1e-6);

        // ln(Phi(-40)) ~ -804.6; the CDF itself underflows to zero.
        let tail = log_normal_cdf(-40.0);
        assert!(tail.is_finite());
        assert!((tail + 804.608).abs() < 0.01);
        assert!(log_normal_cdf(-10.0) > log_normal_cdf(-11.0));
    }
}
