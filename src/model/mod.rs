//! The capacity-versus-discharge-rate model of Tian & Park et al.
//! (<https://www.nature.com/articles/s41467-019-09792-9>).
//!
//! ```text
//! normQ(R) = Q * (1 - (R*tau)^n * (1 - exp(-(R*tau)^(-n))))
//! ```
//!
//! The model is a small, pure function so that fitting code can stay generic.

use crate::domain::FitParams;

/// Largest argument passed to `exp(-x)` before saturating to 0.
///
/// `(R*tau)^(-n)` overflows toward infinity when `R*tau` is small and `n` is
/// large; `exp(-x)` then underflows anyway, and the saturated value matches
/// the well-defined R → 0 limit of the model (`normQ → Q`).
const EXP_NEG_SATURATION: f64 = 745.0;

/// Model-predicted normalized capacity at discharge rate `rate`.
///
/// No validation is performed on parameter signs; negative `tau` or `Q` are
/// allowed as inputs and plausibility is the caller's (the optimizer's)
/// concern.
pub fn norm_capacity(rate: f64, params: &FitParams) -> f64 {
    let x = rate * params.tau;
    let xn = x.powf(params.n);
    let inv = x.powf(-params.n);
    let tail = if !inv.is_finite() || inv > EXP_NEG_SATURATION {
        0.0
    } else {
        (-inv).exp()
    };
    params.q * (1.0 - xn * (1.0 - tail))
}

/// Evaluate the model over a whole rate series.
///
/// The output length always equals the input length.
pub fn predict_series(rates: &[f64], params: &FitParams) -> Vec<f64> {
    rates.iter().map(|&r| norm_capacity(r, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_at_specific_capacity_for_low_rate() {
        let params = FitParams {
            tau: 0.5,
            n: 1.0,
            q: 100.0,
        };
        let y = norm_capacity(1e-9, &params);
        assert!((y - params.q).abs() < 1e-6);
    }

    #[test]
    fn predicted_series_length_matches_input() {
        let params = FitParams {
            tau: 0.5,
            n: 1.0,
            q: 100.0,
        };
        let rates = [0.1, 0.2, 0.5, 1.0, 2.0, 5.0];
        let y = predict_series(&rates, &params);
        assert_eq!(y.len(), rates.len());
    }

    #[test]
    fn large_exponent_saturates_instead_of_overflowing() {
        // (R*tau)^(-n) is astronomically large here; the tail must saturate
        // to 0 and the prediction to Q, without NaN or infinity.
        let params = FitParams {
            tau: 1e-6,
            n: 8.0,
            q: 120.0,
        };
        let y = norm_capacity(1e-3, &params);
        assert!(y.is_finite());
        assert!((y - params.q).abs() < 1e-9);
    }

    #[test]
    fn capacity_decreases_with_rate_for_plausible_params() {
        let params = FitParams {
            tau: 0.5,
            n: 1.0,
            q: 100.0,
        };
        let y_slow = norm_capacity(0.1, &params);
        let y_fast = norm_capacity(10.0, &params);
        assert!(y_slow > y_fast);
    }

    #[test]
    fn negative_parameters_are_accepted_without_panicking() {
        let params = FitParams {
            tau: -0.5,
            n: 1.5,
            q: -10.0,
        };
        // Negative base with fractional exponent yields NaN; that is the
        // caller's problem, not a panic.
        let _ = norm_capacity(1.0, &params);
    }
}
