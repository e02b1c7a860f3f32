//! Levenberg-Marquardt non-linear least squares.
//!
//! In this project we repeatedly solve small curve-fit problems of the form:
//!
//! ```text
//! minimize Σ r_i(p)^2
//! ```
//!
//! over a handful of parameters (three for the discharge model).
//!
//! Implementation choices:
//! - Numeric forward-difference Jacobian. The models here are cheap to
//!   evaluate, so analytic derivatives buy little.
//! - Damped normal equations `(JᵀJ + λ diag(JᵀJ)) δ = Jᵀ r`, solved via SVD
//!   with a tolerance ladder. Extreme parameter values can make the columns
//!   of `J` nearly collinear, so a strict solve is retried with looser
//!   tolerances before the step is rejected.
//! - Covariance of the estimates from `s² (JᵀJ)⁺` with `s² = SSE / (n - p)`.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Maximum damping escalations per outer iteration before giving up on it.
const MAX_STEP_RETRIES: usize = 16;

/// Options controlling the LM iteration.
#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iters: usize,
    /// Relative cost-reduction threshold for convergence.
    pub ftol: f64,
    /// Relative step-size threshold for convergence.
    pub xtol: f64,
    /// Gradient-norm threshold for convergence.
    pub gtol: f64,
    pub lambda_init: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// Converged LM solution.
#[derive(Debug, Clone)]
pub struct LmFit {
    pub params: Vec<f64>,
    /// Estimated parameter covariance (p × p).
    pub covariance: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
}

/// Minimize `‖residual(p)‖²` starting from `p0`.
///
/// `residual` returns `None` when the parameters land outside the evaluable
/// region (non-finite model output); such steps are rejected with increased
/// damping rather than treated as fatal.
///
/// Errors when there are fewer residuals than parameters, when the initial
/// guess is not evaluable, or when the iteration fails to converge.
pub fn least_squares<F>(residual: F, p0: &[f64], opts: &LmOptions) -> Result<LmFit, AppError>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let n_params = p0.len();
    if n_params == 0 {
        return Err(AppError::new(4, "Empty parameter vector."));
    }

    let mut p = DVector::from_column_slice(p0);
    let mut r = residual(p.as_slice())
        .ok_or_else(|| AppError::new(4, "Residuals are not finite at the initial guess."))?;
    if r.len() < n_params {
        return Err(AppError::new(
            3,
            format!(
                "Need at least {n_params} observations for {n_params} parameters, got {}.",
                r.len()
            ),
        ));
    }

    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(AppError::new(4, "Non-finite cost at the initial guess."));
    }

    let mut lambda = opts.lambda_init;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..opts.max_iters {
        iterations = iter + 1;

        let jac = numeric_jacobian(&residual, &p, &r).ok_or_else(|| {
            AppError::new(4, "Jacobian evaluation produced non-finite values.")
        })?;
        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &r;

        // Gradient already flat: we are at (or numerically at) a minimum.
        if jtr.amax() <= opts.gtol {
            converged = true;
            break;
        }

        let mut accepted = false;
        for _ in 0..MAX_STEP_RETRIES {
            let Some(step) = solve_damped(&jtj, &jtr, lambda) else {
                lambda *= opts.lambda_up;
                continue;
            };
            let candidate = &p - &step;
            let Some(r_new) = residual(candidate.as_slice()) else {
                lambda *= opts.lambda_up;
                continue;
            };
            let sse_new = r_new.norm_squared();

            if sse_new.is_finite() && sse_new < sse {
                let cost_drop = sse - sse_new;
                let step_small = step.norm() <= opts.xtol * (p.norm() + opts.xtol);

                p = candidate;
                r = r_new;
                sse = sse_new;
                lambda = (lambda * opts.lambda_down).max(1e-12);
                accepted = true;

                if cost_drop <= opts.ftol * sse.max(opts.ftol) || step_small {
                    converged = true;
                }
                break;
            }
            lambda *= opts.lambda_up;
        }

        if !accepted {
            // The damping ladder found no point with a lower cost: no
            // meaningful descent direction exists, so we are at a numerical
            // minimum. Declaring convergence here mirrors MINPACK's ftol
            // termination rather than failing a finished fit.
            converged = true;
            break;
        }
        if converged {
            break;
        }
    }

    if !converged {
        return Err(AppError::new(
            4,
            format!(
                "Levenberg-Marquardt did not converge within {} iterations.",
                opts.max_iters
            ),
        ));
    }

    let jac = numeric_jacobian(&residual, &p, &r).ok_or_else(|| {
        AppError::new(4, "Jacobian evaluation produced non-finite values at the solution.")
    })?;
    let covariance = covariance_from_jacobian(&jac, sse)?;

    Ok(LmFit {
        params: p.iter().copied().collect(),
        covariance,
        sse,
        iterations,
    })
}

/// Solve `(JᵀJ + λ diag(JᵀJ)) δ = Jᵀ r` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
fn solve_damped(jtj: &DMatrix<f64>, jtr: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let n = jtj.nrows();
    let mut damped = jtj.clone();
    for k in 0..n {
        let d = jtj[(k, k)].abs().max(1e-12);
        damped[(k, k)] += lambda * d;
    }

    let svd = damped.svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(step) = svd.solve(jtr, tol) {
            if step.iter().all(|v| v.is_finite()) {
                return Some(step);
            }
        }
    }

    None
}

/// Forward-difference Jacobian of the residual vector.
fn numeric_jacobian<F>(residual: &F, p: &DVector<f64>, r0: &DVector<f64>) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let n = r0.len();
    let m = p.len();
    let eps = f64::EPSILON.sqrt();

    let mut jac = DMatrix::<f64>::zeros(n, m);
    for k in 0..m {
        let h = eps * p[k].abs().max(eps);
        let mut ph = p.clone();
        ph[k] += h;
        let rh = residual(ph.as_slice())?;
        if rh.len() != n {
            return None;
        }
        for i in 0..n {
            let d = (rh[i] - r0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, k)] = d;
        }
    }
    Some(jac)
}

/// `cov(p) = s² (JᵀJ)⁺` with `s² = SSE / (n - p)`.
///
/// With exactly as many observations as parameters the residual variance is
/// undefined and the covariance degenerates to infinity.
fn covariance_from_jacobian(jac: &DMatrix<f64>, sse: f64) -> Result<DMatrix<f64>, AppError> {
    let n = jac.nrows();
    let m = jac.ncols();

    let jtj = jac.transpose() * jac;
    let pinv = jtj
        .svd(true, true)
        .pseudo_inverse(1e-12)
        .map_err(|e| AppError::new(4, format!("Failed to invert JᵀJ for the covariance: {e}")))?;

    let s2 = if n > m {
        sse / (n - m) as f64
    } else {
        f64::INFINITY
    };
    Ok(pinv * s2)
}
