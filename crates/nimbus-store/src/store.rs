//! Job state: the process-scoped entity/relationship sink shared by steps

use crate::provenance::{AuditEntry, AuditOperation, Provenance};
use async_trait::async_trait;
use chrono::Utc;
use nimbus_core::{Entity, Relationship, RelationshipTarget};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Job state errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobStateError {
    #[error("Duplicate entity key {key} (first committed by step {first_committed_by})")]
    DuplicateKey {
        key: String,
        first_committed_by: String,
    },

    #[error("Relationship key {key} already committed with different content by step {first_committed_by}")]
    DuplicateRelationship {
        key: String,
        first_committed_by: String,
    },

    #[error("Relationship {relationship_key} references unknown entity {missing_key}")]
    DanglingReference {
        relationship_key: String,
        missing_key: String,
    },
}

/// Result of a relationship commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// New record stored
    Committed,
    /// An identical relationship was already stored
    AlreadyPresent,
}

/// Stored entity with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntity {
    pub entity: Entity,
    pub provenance: Provenance,
}

/// Stored relationship with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRelationship {
    pub relationship: Relationship,
    pub provenance: Provenance,
}

/// Job state statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobStateStatistics {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub mapped_relationships: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub relationships_by_type: BTreeMap<String, usize>,
    pub audit_entries: usize,
}

/// Shared job state consumed by steps.
///
/// Entity commits are first-writer-wins: committing a second entity under an
/// existing key is rejected with [`JobStateError::DuplicateKey`]. Relationship
/// commits are idempotent for identical records, rejected with
/// [`JobStateError::DuplicateRelationship`] when the key is reused for a
/// different edge, and rejected when a direct endpoint has not been committed.
#[async_trait]
pub trait JobState: Send + Sync {
    /// Commit one entity
    async fn commit_entity(&self, entity: Entity, provenance: Provenance) -> Result<(), JobStateError>;

    /// Commit one relationship
    async fn commit_relationship(
        &self,
        relationship: Relationship,
        provenance: Provenance,
    ) -> Result<CommitOutcome, JobStateError>;

    /// Look up an entity by key
    async fn find_entity_by_key(&self, key: &str) -> Option<Entity>;

    /// First committed entity of a type, used for singleton upstream entities
    async fn get_upstream_entity(&self, entity_type: &str) -> Option<Entity>;

    /// Whether an entity with this key has been committed
    async fn has_key(&self, key: &str) -> bool;

    /// Keys of all entities of a type, in commit order
    async fn entity_keys_of_type(&self, entity_type: &str) -> Vec<String>;

    /// Store arbitrary data handed between steps
    async fn set_data(&self, key: &str, value: serde_json::Value, provenance: Provenance);

    /// Read data stored with [`JobState::set_data`]
    async fn get_data(&self, key: &str) -> Option<serde_json::Value>;
}

impl dyn JobState {
    /// Visit every entity of a type in commit order.
    ///
    /// The key list is captured up front; entities committed by the callback
    /// itself are not visited.
    pub async fn iterate_entities_of_type<F, Fut, E>(
        &self,
        entity_type: &str,
        mut callback: F,
    ) -> Result<usize, E>
    where
        F: FnMut(Entity) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
    {
        let keys = self.entity_keys_of_type(entity_type).await;
        let mut visited = 0;
        for key in keys {
            if let Some(entity) = self.find_entity_by_key(&key).await {
                callback(entity).await?;
                visited += 1;
            }
        }
        Ok(visited)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entities: HashMap<String, StoredEntity>,
    entity_order: Vec<String>,
    type_index: HashMap<String, Vec<String>>,
    relationships: HashMap<String, StoredRelationship>,
    relationship_order: Vec<String>,
    data: HashMap<String, serde_json::Value>,
    audit_trail: Vec<AuditEntry>,
    audit_limit: Option<usize>,
}

impl Inner {
    fn audit(&mut self, operation: AuditOperation, actor: &str) {
        self.audit_trail.push(AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            operation,
            actor: Some(actor.to_string()),
        });

        if let Some(limit) = self.audit_limit {
            if self.audit_trail.len() > limit {
                let excess = self.audit_trail.len() - limit;
                self.audit_trail.drain(..excess);
            }
        }
    }
}

/// In-memory job state
#[derive(Debug, Default)]
pub struct InMemoryJobState {
    inner: RwLock<Inner>,
}

impl InMemoryJobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the most recent `limit` audit entries
    pub fn with_audit_limit(limit: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                audit_limit: Some(limit),
                ..Inner::default()
            }),
        }
    }

    /// All entities in commit order
    pub async fn entities(&self) -> Vec<StoredEntity> {
        let inner = self.inner.read().await;
        inner
            .entity_order
            .iter()
            .filter_map(|key| inner.entities.get(key).cloned())
            .collect()
    }

    /// All relationships in commit order
    pub async fn relationships(&self) -> Vec<StoredRelationship> {
        let inner = self.inner.read().await;
        inner
            .relationship_order
            .iter()
            .filter_map(|key| inner.relationships.get(key).cloned())
            .collect()
    }

    pub async fn find_relationship_by_key(&self, key: &str) -> Option<Relationship> {
        let inner = self.inner.read().await;
        inner.relationships.get(key).map(|stored| stored.relationship.clone())
    }

    /// Relationships originating at an entity
    pub async fn relationships_from(&self, from_key: &str) -> Vec<Relationship> {
        let inner = self.inner.read().await;
        inner
            .relationship_order
            .iter()
            .filter_map(|key| inner.relationships.get(key))
            .filter(|stored| stored.relationship.from_key == from_key)
            .map(|stored| stored.relationship.clone())
            .collect()
    }

    /// Get audit trail
    pub async fn audit_trail(&self) -> Vec<AuditEntry> {
        self.inner.read().await.audit_trail.clone()
    }

    /// Get statistics
    pub async fn statistics(&self) -> JobStateStatistics {
        let inner = self.inner.read().await;
        let mut stats = JobStateStatistics {
            total_entities: inner.entities.len(),
            total_relationships: inner.relationships.len(),
            audit_entries: inner.audit_trail.len(),
            ..JobStateStatistics::default()
        };

        for (entity_type, keys) in &inner.type_index {
            stats.entities_by_type.insert(entity_type.clone(), keys.len());
        }
        for stored in inner.relationships.values() {
            if stored.relationship.is_mapped() {
                stats.mapped_relationships += 1;
            }
            *stats
                .relationships_by_type
                .entry(stored.relationship.relationship_type.clone())
                .or_insert(0) += 1;
        }

        stats
    }
}

#[async_trait]
impl JobState for InMemoryJobState {
    async fn commit_entity(&self, entity: Entity, provenance: Provenance) -> Result<(), JobStateError> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.entities.get(&entity.key) {
            let error = JobStateError::DuplicateKey {
                key: entity.key.clone(),
                first_committed_by: existing.provenance.step_id.clone(),
            };
            inner.audit(
                AuditOperation::Rejected {
                    key: entity.key.clone(),
                    reason: error.to_string(),
                },
                &provenance.step_id,
            );
            return Err(error);
        }

        let key = entity.key.clone();
        let entity_type = entity.entity_type.clone();
        let actor = provenance.step_id.clone();

        inner.entity_order.push(key.clone());
        inner
            .type_index
            .entry(entity_type.clone())
            .or_insert_with(Vec::new)
            .push(key.clone());
        inner.entities.insert(key.clone(), StoredEntity { entity, provenance });
        inner.audit(AuditOperation::CommitEntity { key, entity_type }, &actor);

        Ok(())
    }

    async fn commit_relationship(
        &self,
        relationship: Relationship,
        provenance: Provenance,
    ) -> Result<CommitOutcome, JobStateError> {
        let mut inner = self.inner.write().await;
        let actor = provenance.step_id.clone();

        let mut missing = None;
        if !inner.entities.contains_key(&relationship.from_key) {
            missing = Some(relationship.from_key.clone());
        } else if let RelationshipTarget::Direct { key, .. } = &relationship.target {
            if !inner.entities.contains_key(key) {
                missing = Some(key.clone());
            }
        }

        if let Some(missing_key) = missing {
            let error = JobStateError::DanglingReference {
                relationship_key: relationship.key.clone(),
                missing_key,
            };
            inner.audit(
                AuditOperation::Rejected {
                    key: relationship.key.clone(),
                    reason: error.to_string(),
                },
                &actor,
            );
            return Err(error);
        }

        if let Some(existing) = inner.relationships.get(&relationship.key) {
            if existing.relationship == relationship {
                let key = relationship.key.clone();
                inner.audit(AuditOperation::RecommitRelationship { key }, &actor);
                return Ok(CommitOutcome::AlreadyPresent);
            }

            let error = JobStateError::DuplicateRelationship {
                key: relationship.key.clone(),
                first_committed_by: existing.provenance.step_id.clone(),
            };
            inner.audit(
                AuditOperation::Rejected {
                    key: relationship.key.clone(),
                    reason: error.to_string(),
                },
                &actor,
            );
            return Err(error);
        }

        let operation = AuditOperation::CommitRelationship {
            key: relationship.key.clone(),
            relationship_type: relationship.relationship_type.clone(),
            mapped: relationship.is_mapped(),
        };
        inner.relationship_order.push(relationship.key.clone());
        inner.relationships.insert(
            relationship.key.clone(),
            StoredRelationship { relationship, provenance },
        );
        inner.audit(operation, &actor);

        Ok(CommitOutcome::Committed)
    }

    async fn find_entity_by_key(&self, key: &str) -> Option<Entity> {
        let inner = self.inner.read().await;
        inner.entities.get(key).map(|stored| stored.entity.clone())
    }

    async fn get_upstream_entity(&self, entity_type: &str) -> Option<Entity> {
        let inner = self.inner.read().await;
        inner
            .type_index
            .get(entity_type)
            .and_then(|keys| keys.first())
            .and_then(|key| inner.entities.get(key))
            .map(|stored| stored.entity.clone())
    }

    async fn has_key(&self, key: &str) -> bool {
        self.inner.read().await.entities.contains_key(key)
    }

    async fn entity_keys_of_type(&self, entity_type: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.type_index.get(entity_type).cloned().unwrap_or_default()
    }

    async fn set_data(&self, key: &str, value: serde_json::Value, provenance: Provenance) {
        let mut inner = self.inner.write().await;
        inner.data.insert(key.to_string(), value);
        inner.audit(AuditOperation::SetData { key: key.to_string() }, &provenance.step_id);
    }

    async fn get_data(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.read().await.data.get(key).cloned()
    }
}
