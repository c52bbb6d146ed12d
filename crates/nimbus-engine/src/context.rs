//! Execution context handed to a step handler

use crate::error::StepError;
use nimbus_core::{EndpointTracker, Entity, Relationship};
use nimbus_store::{CommitOutcome, JobState, Provenance};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A child traversal that failed for one parent and was absorbed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingFailure {
    /// Key of the parent whose children could not be fetched
    pub parent_key: String,
    pub endpoint: Option<String>,
    pub message: String,
    pub permission_denied: bool,
}

#[derive(Debug, Default)]
struct Progress {
    entities: AtomicUsize,
    relationships: AtomicUsize,
    sibling_failures: Mutex<Vec<SiblingFailure>>,
}

/// Job state access, services and bookkeeping for one step execution.
///
/// Commits go straight to job state, so everything committed before a later
/// failure is retained.
pub struct StepContext<C> {
    step_id: String,
    job_state: Arc<dyn JobState>,
    services: Arc<C>,
    tracker: EndpointTracker,
    upstream_failures: Vec<String>,
    progress: Arc<Progress>,
}

impl<C> StepContext<C> {
    pub fn new(step_id: &str, job_state: Arc<dyn JobState>, services: Arc<C>) -> Self {
        Self {
            step_id: step_id.to_string(),
            job_state,
            services,
            tracker: EndpointTracker::new(),
            upstream_failures: Vec::new(),
            progress: Arc::new(Progress::default()),
        }
    }

    pub fn with_upstream_failures(mut self, upstream_failures: Vec<String>) -> Self {
        self.upstream_failures = upstream_failures;
        self
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn job_state(&self) -> &(dyn JobState + 'static) {
        self.job_state.as_ref()
    }

    pub fn services(&self) -> &C {
        &self.services
    }

    /// Tracker to hand to resource clients so a timeout can name the endpoint
    pub fn tracker(&self) -> &EndpointTracker {
        &self.tracker
    }

    /// Dependencies of this step that failed in this run
    pub fn upstream_failures(&self) -> &[String] {
        &self.upstream_failures
    }

    fn provenance(&self) -> Provenance {
        Provenance::step(&self.step_id)
    }

    /// Commit an entity immediately
    pub async fn commit_entity(&self, entity: Entity) -> Result<(), StepError> {
        self.job_state.commit_entity(entity, self.provenance()).await?;
        self.progress.entities.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Commit a relationship; an identical recommit is not counted again
    pub async fn commit_relationship(&self, relationship: Relationship) -> Result<CommitOutcome, StepError> {
        let outcome = self
            .job_state
            .commit_relationship(relationship, self.provenance())
            .await?;
        if outcome == CommitOutcome::Committed {
            self.progress.relationships.fetch_add(1, Ordering::Relaxed);
        }
        Ok(outcome)
    }

    /// Singleton upstream entity this step cannot proceed without
    pub async fn require_upstream_entity(&self, entity_type: &str) -> Result<Entity, StepError> {
        self.job_state
            .get_upstream_entity(entity_type)
            .await
            .ok_or_else(|| StepError::MissingUpstreamDependency {
                step_id: self.step_id.clone(),
                entity_type: entity_type.to_string(),
            })
    }

    pub async fn find_entity(&self, key: &str) -> Option<Entity> {
        self.job_state.find_entity_by_key(key).await
    }

    pub async fn has_entity(&self, key: &str) -> bool {
        self.job_state.has_key(key).await
    }

    /// Run one parent's child traversal in isolation.
    ///
    /// Provider and handler failures are logged with the parent key, recorded
    /// as a sibling failure and absorbed (`Ok(false)`). Defects still fail the
    /// step.
    pub async fn isolate<Fut>(&self, parent_key: &str, traversal: Fut) -> Result<bool, StepError>
    where
        Fut: Future<Output = Result<(), StepError>>,
    {
        match traversal.await {
            Ok(()) => Ok(true),
            Err(error) if error.is_defect() => Err(error),
            Err(error) => {
                self.record_sibling_failure(parent_key, &error);
                Ok(false)
            }
        }
    }

    pub fn record_sibling_failure(&self, parent_key: &str, error: &StepError) {
        let endpoint = error.endpoint().map(str::to_string).or_else(|| self.tracker.current());
        warn!(
            step_id = %self.step_id,
            parent_key = %parent_key,
            endpoint = endpoint.as_deref().unwrap_or("unknown"),
            permission_denied = error.is_permission_denied(),
            error = %error,
            "Child traversal failed; continuing with sibling resources"
        );

        let failure = SiblingFailure {
            parent_key: parent_key.to_string(),
            endpoint,
            message: error.to_string(),
            permission_denied: error.is_permission_denied(),
        };
        self.progress
            .sibling_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(failure);
    }

    pub fn entities_committed(&self) -> usize {
        self.progress.entities.load(Ordering::Relaxed)
    }

    pub fn relationships_committed(&self) -> usize {
        self.progress.relationships.load(Ordering::Relaxed)
    }

    pub fn sibling_failures(&self) -> Vec<SiblingFailure> {
        self.progress
            .sibling_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl<C> Clone for StepContext<C> {
    fn clone(&self) -> Self {
        Self {
            step_id: self.step_id.clone(),
            job_state: Arc::clone(&self.job_state),
            services: Arc::clone(&self.services),
            tracker: self.tracker.clone(),
            upstream_failures: self.upstream_failures.clone(),
            progress: Arc::clone(&self.progress),
        }
    }
}
