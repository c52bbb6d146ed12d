//! Snapshot export for job state

use crate::store::{InMemoryJobState, JobStateStatistics, StoredEntity, StoredRelationship};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Point-in-time copy of everything a run committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStateSnapshot {
    pub entities: Vec<StoredEntity>,
    pub relationships: Vec<StoredRelationship>,
    pub statistics: JobStateStatistics,
}

impl InMemoryJobState {
    /// Capture a snapshot of the current state
    pub async fn snapshot(&self) -> JobStateSnapshot {
        JobStateSnapshot {
            entities: self.entities().await,
            relationships: self.relationships().await,
            statistics: self.statistics().await,
        }
    }
}

/// Export functionality
pub mod export {
    use super::*;

    /// Write a snapshot as pretty-printed JSON
    pub async fn write_snapshot(snapshot: &JobStateSnapshot, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Read a snapshot written by [`write_snapshot`]
    pub async fn read_snapshot(path: &Path) -> Result<JobStateSnapshot> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Export audit trail to JSON
    pub async fn export_audit_trail(state: &InMemoryJobState) -> Result<String> {
        let json = serde_json::to_string_pretty(&state.audit_trail().await)?;
        Ok(json)
    }

    /// Export statistics
    pub async fn export_statistics(state: &InMemoryJobState) -> Result<String> {
        let json = serde_json::to_string_pretty(&state.statistics().await)?;
        Ok(json)
    }
}
