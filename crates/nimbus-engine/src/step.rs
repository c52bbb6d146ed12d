//! Step declarations

use crate::context::StepContext;
use crate::error::StepError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Execution body of a step
#[async_trait]
pub trait StepHandler<C>: Send + Sync {
    async fn execute(&self, context: &StepContext<C>) -> Result<(), StepError>;
}

/// Per-step state machine: `Pending -> Running -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Declarative part of a step, without its handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub id: String,
    pub name: String,
    pub depends_on: Vec<String>,
    pub produces_entities: Vec<String>,
    pub produces_relationships: Vec<String>,
    pub required_permissions: Vec<String>,
}

/// A statically declared unit of ingestion work
pub struct Step<C> {
    pub metadata: StepMetadata,
    pub handler: Arc<dyn StepHandler<C>>,
}

impl<C> Step<C> {
    pub fn new(id: &str, name: &str, handler: Arc<dyn StepHandler<C>>) -> Self {
        Self {
            metadata: StepMetadata {
                id: id.to_string(),
                name: name.to_string(),
                depends_on: Vec::new(),
                produces_entities: Vec::new(),
                produces_relationships: Vec::new(),
                required_permissions: Vec::new(),
            },
            handler,
        }
    }

    /// Dependencies form a set; repeated ids are kept once
    pub fn depends_on<S: AsRef<str>>(mut self, step_ids: &[S]) -> Self {
        self.metadata.depends_on = to_strings(step_ids);
        dedup_in_order(&mut self.metadata.depends_on);
        self
    }

    pub fn produces_entities<S: AsRef<str>>(mut self, entity_types: &[S]) -> Self {
        self.metadata.produces_entities = to_strings(entity_types);
        self
    }

    pub fn produces_relationships<S: AsRef<str>>(mut self, relationship_types: &[S]) -> Self {
        self.metadata.produces_relationships = to_strings(relationship_types);
        self
    }

    pub fn requires_permissions<S: AsRef<str>>(mut self, permissions: &[S]) -> Self {
        self.metadata.required_permissions = to_strings(permissions);
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("metadata", &self.metadata).finish()
    }
}

fn to_strings<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| v.as_ref().to_string()).collect()
}

pub(crate) fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}
