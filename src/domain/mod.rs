//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - dataset identifiers and sample series (`DatasetKey`, `Dataset`)
//! - discharge-model parameters (`FitParams`)
//! - batch outputs (`FitRow`, `FitTable`, `BatchStats`)
//! - run configuration (`BatchConfig`)

pub mod types;

pub use types::*;
