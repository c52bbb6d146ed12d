//! # Nimbus CLI Library
//!
//! Command-line surface for running ingestion jobs, listing the step catalog
//! and validating configuration.

pub mod commands;

pub use commands::*;
