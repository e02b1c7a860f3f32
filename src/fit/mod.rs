//! Fit engine: map (rate, capacity) observations to `(tau, n, Q)`.
//!
//! Responsibilities:
//!
//! - build the residual function against the discharge model
//! - run the LM solver from a caller-supplied initial guess
//! - derive standard errors from the covariance diagonal

pub mod engine;

pub use engine::*;
