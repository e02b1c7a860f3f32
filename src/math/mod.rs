//! Mathematical utilities: non-linear least squares.

pub mod lm;

pub use lm::*;
