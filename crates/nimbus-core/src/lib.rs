//! # Nimbus Core
//!
//! Normalized graph model for cloud-resource ingestion:
//! entities, direct and mapped relationships, and the deterministic
//! key and relationship-type derivation shared by every step.

pub mod keys;
pub mod model;
pub mod tracker;

pub use keys::*;
pub use model::*;
pub use tracker::*;
