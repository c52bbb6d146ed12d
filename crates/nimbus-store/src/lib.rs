//! # Nimbus Store
//!
//! Job state shared by ingestion steps: first-writer-wins entity commits,
//! reference-checked relationship commits, commit provenance and an audit trail.

pub mod persistence;
pub mod provenance;
pub mod store;

pub use persistence::*;
pub use provenance::*;
pub use store::*;
