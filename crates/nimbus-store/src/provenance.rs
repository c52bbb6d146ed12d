//! Commit provenance and audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which step committed a record, and when
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    /// Identifier of the committing step
    pub step_id: String,
    /// Commit timestamp
    pub committed_at: DateTime<Utc>,
}

impl Provenance {
    pub fn step(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            committed_at: Utc::now(),
        }
    }
}

/// Audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique audit ID
    pub id: String,
    /// Timestamp of the operation
    pub timestamp: DateTime<Utc>,
    /// Operation type
    pub operation: AuditOperation,
    /// Step that performed the operation
    pub actor: Option<String>,
}

/// Types of audit operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditOperation {
    /// Entity committed
    CommitEntity {
        key: String,
        entity_type: String,
    },
    /// Relationship committed
    CommitRelationship {
        key: String,
        relationship_type: String,
        mapped: bool,
    },
    /// Identical relationship committed again
    RecommitRelationship {
        key: String,
    },
    /// Commit rejected
    Rejected {
        key: String,
        reason: String,
    },
    /// Key-value data written
    SetData {
        key: String,
    },
}
