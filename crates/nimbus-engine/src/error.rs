//! Step and graph errors

use nimbus_core::KeyError;
use nimbus_provider::ProviderError;
use nimbus_store::JobStateError;
use std::time::Duration;

/// Errors raised while executing one step
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Step {step_id} requires an upstream {entity_type} entity, but none is in job state")]
    MissingUpstreamDependency { step_id: String, entity_type: String },

    #[error("Relationship {relationship_key} references {missing_key}, which was never committed and is not mapped")]
    DanglingRelationship {
        relationship_key: String,
        missing_key: String,
    },

    #[error("Duplicate entity key {key} (first committed by step {first_committed_by})")]
    DuplicateEntity { key: String, first_committed_by: String },

    #[error("Relationship key {key} reused for a different edge (first committed by step {first_committed_by})")]
    DuplicateRelationship { key: String, first_committed_by: String },

    #[error("Record could not be converted: {0}")]
    Conversion(#[from] KeyError),

    #[error("Step {step_id} exceeded its {deadline:?} deadline{}", while_fetching(.endpoint))]
    Timeout {
        step_id: String,
        deadline: Duration,
        endpoint: Option<String>,
    },

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

fn while_fetching(endpoint: &Option<String>) -> String {
    endpoint
        .as_ref()
        .map(|e| format!(" while fetching {}", e))
        .unwrap_or_default()
}

impl From<JobStateError> for StepError {
    fn from(error: JobStateError) -> Self {
        match error {
            JobStateError::DuplicateKey {
                key,
                first_committed_by,
            } => StepError::DuplicateEntity {
                key,
                first_committed_by,
            },
            JobStateError::DuplicateRelationship {
                key,
                first_committed_by,
            } => StepError::DuplicateRelationship {
                key,
                first_committed_by,
            },
            JobStateError::DanglingReference {
                relationship_key,
                missing_key,
            } => StepError::DanglingRelationship {
                relationship_key,
                missing_key,
            },
        }
    }
}

impl StepError {
    /// Converter or dependency-declaration defects; never absorbed by sibling isolation
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            StepError::MissingUpstreamDependency { .. }
                | StepError::DanglingRelationship { .. }
                | StepError::DuplicateEntity { .. }
                | StepError::DuplicateRelationship { .. }
        )
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StepError::Provider(e) if e.is_permission_denied())
    }

    /// Provider endpoint associated with the failure, when known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            StepError::Provider(e) => e.endpoint(),
            StepError::Timeout { endpoint, .. } => endpoint.as_deref(),
            _ => None,
        }
    }
}

/// Step graph construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Step {0} is declared more than once")]
    DuplicateStep(String),

    #[error("Step {step} depends on undeclared step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Unknown step {0} in the active step list")]
    UnknownStep(String),

    #[error("Active step {step} depends on inactive step {dependency}")]
    InactiveDependency { step: String, dependency: String },

    #[error("Dependency cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}
