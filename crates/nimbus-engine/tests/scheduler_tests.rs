//! Tests for the nimbus-engine scheduler

use async_trait::async_trait;
use nimbus_core::{Entity, Relationship, RelationshipClass};
use nimbus_engine::*;
use nimbus_store::{InMemoryJobState, JobState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Services shared by the test handlers: an event log and a concurrency gauge
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {} not recorded", event))
    }
}

/// Records start/end, yields, and optionally fails
struct Probe {
    fail: bool,
}

#[async_trait]
impl StepHandler<Recorder> for Probe {
    async fn execute(&self, context: &StepContext<Recorder>) -> Result<(), StepError> {
        let recorder = context.services();
        let now = recorder.running.fetch_add(1, Ordering::SeqCst) + 1;
        recorder.peak.fetch_max(now, Ordering::SeqCst);
        recorder.push(format!("{}:start", context.step_id()));

        tokio::time::sleep(Duration::from_millis(10)).await;

        recorder.running.fetch_sub(1, Ordering::SeqCst);
        recorder.push(format!("{}:end", context.step_id()));

        if self.fail {
            Err(anyhow::anyhow!("{} failed", context.step_id()).into())
        } else {
            Ok(())
        }
    }
}

fn probe(id: &str, deps: &[&str]) -> Step<Recorder> {
    Step::new(id, id, Arc::new(Probe { fail: false })).depends_on(deps)
}

fn failing(id: &str, deps: &[&str]) -> Step<Recorder> {
    Step::new(id, id, Arc::new(Probe { fail: true })).depends_on(deps)
}

async fn run(steps: Vec<Step<Recorder>>, options: SchedulerOptions) -> (RunReport, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let scheduler = StepScheduler::new(StepGraph::new(steps).unwrap()).with_options(options);
    let report = scheduler
        .run(Arc::new(InMemoryJobState::new()), Arc::clone(&recorder))
        .await;
    (report, recorder)
}

#[tokio::test]
async fn test_dependents_start_after_dependency_completes() {
    let (report, recorder) = run(
        vec![probe("a", &[]), probe("b", &["a"]), probe("c", &["a"])],
        SchedulerOptions::default(),
    )
    .await;

    assert!(report.succeeded());
    let a_end = recorder.position("a:end");
    assert!(recorder.position("b:start") > a_end);
    assert!(recorder.position("c:start") > a_end);
    assert_eq!(
        report.executions.iter().map(|e| e.step_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
}

#[tokio::test]
async fn test_repeated_dependency_still_runs_dependent() {
    let (report, recorder) = run(
        vec![probe("a", &[]), probe("b", &["a", "a"])],
        SchedulerOptions::default(),
    )
    .await;

    assert!(report.succeeded());
    assert_eq!(report.execution("b").unwrap().status, StepStatus::Completed);
    assert!(recorder.position("b:start") > recorder.position("a:end"));
}

#[tokio::test]
async fn test_repeated_dependency_in_raw_metadata_is_collapsed() {
    let mut b = probe("b", &["a"]);
    b.metadata.depends_on = vec!["a".to_string(), "a".to_string()];
    let graph = StepGraph::new(vec![probe("a", &[]), b]).unwrap();
    assert_eq!(graph.get("b").unwrap().metadata.depends_on, vec!["a".to_string()]);

    let recorder = Arc::new(Recorder::default());
    let report = StepScheduler::new(graph)
        .run(Arc::new(InMemoryJobState::new()), Arc::clone(&recorder))
        .await;
    assert!(report.succeeded());
    assert_eq!(recorder.events(), vec!["a:start", "a:end", "b:start", "b:end"]);
}

#[tokio::test]
async fn test_independent_steps_run_concurrently_within_bound() {
    let steps = vec![
        probe("root", &[]),
        probe("s1", &["root"]),
        probe("s2", &["root"]),
        probe("s3", &["root"]),
        probe("s4", &["root"]),
    ];

    let (_, unbounded) = run(
        steps.clone(),
        SchedulerOptions {
            max_concurrent_steps: 8,
            step_deadline: None,
        },
    )
    .await;
    assert_eq!(unbounded.peak.load(Ordering::SeqCst), 4);

    let (report, bounded) = run(
        steps,
        SchedulerOptions {
            max_concurrent_steps: 2,
            step_deadline: None,
        },
    )
    .await;
    assert!(report.succeeded());
    assert_eq!(bounded.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_dependency_is_reported_not_enforced() {
    let (report, recorder) = run(
        vec![failing("a", &[]), probe("b", &["a"])],
        SchedulerOptions::default(),
    )
    .await;

    assert!(!report.succeeded());
    assert_eq!(report.failed_steps(), vec!["a"]);

    let b = report.execution("b").unwrap();
    assert_eq!(b.status, StepStatus::Completed);
    assert_eq!(b.upstream_failures, vec!["a".to_string()]);
    assert!(recorder.position("b:start") > recorder.position("a:end"));
}

/// Needs the account entity; commits one user linked to it
struct NeedsAccount;

#[async_trait]
impl StepHandler<Recorder> for NeedsAccount {
    async fn execute(&self, context: &StepContext<Recorder>) -> Result<(), StepError> {
        let account = context.require_upstream_entity("azure_account").await?;
        let user = Entity::new("user-1", "azure_user", &["User"]);
        context.commit_entity(user.clone()).await?;
        context
            .commit_relationship(Relationship::direct(RelationshipClass::Has, &account, &user))
            .await?;
        Ok(())
    }
}

/// Commits the account, then fails
struct AccountThenFail;

#[async_trait]
impl StepHandler<Recorder> for AccountThenFail {
    async fn execute(&self, context: &StepContext<Recorder>) -> Result<(), StepError> {
        context
            .commit_entity(Entity::new("account-1", "azure_account", &["Account"]))
            .await?;
        Err(anyhow::anyhow!("subscription lookup failed").into())
    }
}

#[tokio::test]
async fn test_missing_upstream_entity_fails_dependent() {
    let steps = vec![
        failing("fetch-account", &[]),
        Step::new("fetch-users", "Users", Arc::new(NeedsAccount)).depends_on(&["fetch-account"]),
    ];
    let (report, _) = run(steps, SchedulerOptions::default()).await;

    let users = report.execution("fetch-users").unwrap();
    assert_eq!(users.status, StepStatus::Failed);
    assert!(users.error.as_deref().unwrap().contains("azure_account"));
    assert!(!users.partial_data_retained);
}

#[tokio::test]
async fn test_partial_data_survives_step_failure() {
    let job_state = Arc::new(InMemoryJobState::new());
    let steps = vec![
        Step::new("fetch-account", "Account", Arc::new(AccountThenFail)),
        Step::new("fetch-users", "Users", Arc::new(NeedsAccount)).depends_on(&["fetch-account"]),
    ];
    let scheduler = StepScheduler::new(StepGraph::new(steps).unwrap());
    let shared: Arc<dyn JobState> = job_state.clone();
    let report = scheduler.run(shared, Arc::new(Recorder::default())).await;

    let account = report.execution("fetch-account").unwrap();
    assert_eq!(account.status, StepStatus::Failed);
    assert!(account.partial_data_retained);
    assert_eq!(account.entities_committed, 1);

    let users = report.execution("fetch-users").unwrap();
    assert_eq!(users.status, StepStatus::Completed);
    assert_eq!(users.upstream_failures, vec!["fetch-account".to_string()]);
    assert_eq!(users.relationships_committed, 1);
    assert!(job_state.has_key("user-1").await);
}

#[tokio::test]
async fn test_inactive_steps_are_not_run() {
    let graph = StepGraph::with_active_steps(
        vec![probe("a", &[]), probe("b", &["a"]), probe("c", &["a"])],
        &["a", "c"],
    )
    .unwrap();
    let recorder = Arc::new(Recorder::default());
    let report = StepScheduler::new(graph)
        .run(Arc::new(InMemoryJobState::new()), Arc::clone(&recorder))
        .await;

    assert_eq!(report.executions.len(), 2);
    assert!(report.execution("b").is_none());
    assert!(!recorder.events().iter().any(|e| e.starts_with("b:")));
}
