//! Run and step execution reports

use crate::context::SiblingFailure;
use crate::step::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one step in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_id: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub entities_committed: usize,
    pub relationships_committed: usize,
    pub error: Option<String>,
    /// Endpoint in flight when the step failed
    pub endpoint: Option<String>,
    pub permission_denied: bool,
    /// Whether a failed step left committed records behind
    pub partial_data_retained: bool,
    pub sibling_failures: Vec<SiblingFailure>,
    /// Dependencies that had failed when this step started
    pub upstream_failures: Vec<String>,
}

impl StepExecution {
    pub fn pending(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            entities_committed: 0,
            relationships_committed: 0,
            error: None,
            endpoint: None,
            permission_denied: false,
            partial_data_retained: false,
            sibling_failures: Vec::new(),
            upstream_failures: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// One execution per active step, in execution order
    pub executions: Vec<StepExecution>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.executions.iter().all(|e| e.status == StepStatus::Completed)
    }

    pub fn execution(&self, step_id: &str) -> Option<&StepExecution> {
        self.executions.iter().find(|e| e.step_id == step_id)
    }

    pub fn failed_steps(&self) -> Vec<&str> {
        self.executions
            .iter()
            .filter(|e| e.is_failed())
            .map(|e| e.step_id.as_str())
            .collect()
    }

    pub fn total_entities(&self) -> usize {
        self.executions.iter().map(|e| e.entities_committed).sum()
    }

    pub fn total_relationships(&self) -> usize {
        self.executions.iter().map(|e| e.relationships_committed).sum()
    }

    pub fn sibling_failure_count(&self) -> usize {
        self.executions.iter().map(|e| e.sibling_failures.len()).sum()
    }
}
