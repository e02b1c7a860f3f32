//! Input/output helpers.
//!
//! - wide-table ingest + validation (`ingest`)
//! - fit-table exports (CSV/JSON) and table serialization (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
