//! # Nimbus Azure Integration
//!
//! Ingests an Azure subscription and its directory tenant into the graph:
//! configuration, pure record converters, the step handlers and the static
//! step catalog the scheduler runs.

pub mod config;
pub mod constants;
pub mod converters;
pub mod services;
pub mod steps;

pub use config::{ConfigError, IntegrationConfig, RetrySettings};
pub use services::AzureServices;
pub use steps::{all_steps, build_graph, catalog_step_ids, default_active_steps, AzureStep};
