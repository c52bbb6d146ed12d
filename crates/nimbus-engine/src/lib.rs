//! # Nimbus Engine
//!
//! Step declaration, dependency graph validation and dependency-ordered
//! execution for ingestion runs.

pub mod context;
pub mod error;
pub mod graph;
pub mod report;
pub mod scheduler;
pub mod step;

pub use context::*;
pub use error::*;
pub use graph::*;
pub use report::*;
pub use scheduler::*;
pub use step::*;
