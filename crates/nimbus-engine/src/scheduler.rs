//! Dependency-ordered step scheduler

use crate::context::StepContext;
use crate::error::StepError;
use crate::graph::StepGraph;
use crate::report::{RunReport, StepExecution};
use crate::step::{Step, StepStatus};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use nimbus_store::JobState;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Independent steps allowed to run at once
    pub max_concurrent_steps: usize,
    /// Overall deadline per step execution
    pub step_deadline: Option<Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_steps: 4,
            step_deadline: Some(Duration::from_secs(900)),
        }
    }
}

/// Runs the active steps of a [`StepGraph`] once each.
///
/// Steps are cooperative tasks on the caller's runtime. A step starts once
/// every dependency has reached a terminal state; failed dependencies are
/// handed to the step as upstream failures rather than failing it, so the
/// step's own handler decides whether it can proceed.
pub struct StepScheduler<C> {
    graph: StepGraph<C>,
    options: SchedulerOptions,
}

impl<C: Send + Sync + 'static> StepScheduler<C> {
    pub fn new(graph: StepGraph<C>) -> Self {
        Self {
            graph,
            options: SchedulerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(&self) -> &StepGraph<C> {
        &self.graph
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Execute every active step against shared job state
    pub async fn run(&self, job_state: Arc<dyn JobState>, services: Arc<C>) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("ingestion_run", run_id = %run_id);
        self.run_steps(run_id, job_state, services).instrument(span).await
    }

    async fn run_steps(&self, run_id: String, job_state: Arc<dyn JobState>, services: Arc<C>) -> RunReport {
        let started_at = Utc::now();
        let order = self.graph.execution_order();
        let limit = self.options.max_concurrent_steps.max(1);

        let mut executions: HashMap<String, StepExecution> = order
            .iter()
            .map(|s| (s.id().to_string(), StepExecution::pending(s.id())))
            .collect();
        let mut waiting: HashMap<&str, usize> = order
            .iter()
            .map(|s| (s.id(), s.metadata.depends_on.len()))
            .collect();
        let mut ready: VecDeque<&Step<C>> = order
            .iter()
            .filter(|s| s.metadata.depends_on.is_empty())
            .copied()
            .collect();
        let mut running = FuturesUnordered::new();

        info!(steps = order.len(), max_concurrent = limit, "Starting ingestion run");

        loop {
            while running.len() < limit {
                let Some(step) = ready.pop_front() else {
                    break;
                };

                let upstream_failures: Vec<String> = step
                    .metadata
                    .depends_on
                    .iter()
                    .filter(|d| executions.get(d.as_str()).is_some_and(|e| e.is_failed()))
                    .cloned()
                    .collect();

                if let Some(execution) = executions.get_mut(step.id()) {
                    execution.status = StepStatus::Running;
                }
                running.push(self.execute_step(
                    step,
                    Arc::clone(&job_state),
                    Arc::clone(&services),
                    upstream_failures,
                ));
            }

            let Some(execution) = running.next().await else {
                break;
            };

            for dependent in self.graph.dependents(&execution.step_id) {
                if let Some(count) = waiting.get_mut(dependent.id()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
            executions.insert(execution.step_id.clone(), execution);
        }

        let executions: Vec<StepExecution> = order
            .iter()
            .filter_map(|s| executions.remove(s.id()))
            .map(|mut execution| {
                if execution.status == StepStatus::Pending {
                    execution.status = StepStatus::Failed;
                    execution.error =
                        Some("Step was never scheduled: its dependencies did not all finish".to_string());
                    error!(step_id = %execution.step_id, "Step left pending at end of run");
                }
                execution
            })
            .collect();

        let report = RunReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            executions,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed_steps().len(),
            entities = report.total_entities(),
            relationships = report.total_relationships(),
            "Ingestion run finished"
        );

        report
    }

    async fn execute_step(
        &self,
        step: &Step<C>,
        job_state: Arc<dyn JobState>,
        services: Arc<C>,
        upstream_failures: Vec<String>,
    ) -> StepExecution {
        let span = info_span!("step", step_id = %step.id());

        async move {
            let context =
                StepContext::new(step.id(), job_state, services).with_upstream_failures(upstream_failures.clone());

            let mut execution = StepExecution::pending(step.id());
            execution.status = StepStatus::Running;
            execution.started_at = Some(Utc::now());
            execution.upstream_failures = upstream_failures;

            if execution.upstream_failures.is_empty() {
                info!("Step started");
            } else {
                warn!(upstream_failures = ?execution.upstream_failures, "Step started after failed dependencies");
            }

            let clock = Instant::now();
            let result = match self.options.step_deadline {
                Some(deadline) => match tokio::time::timeout(deadline, step.handler.execute(&context)).await {
                    Ok(result) => result,
                    Err(_) => Err(StepError::Timeout {
                        step_id: step.id().to_string(),
                        deadline,
                        endpoint: context.tracker().current(),
                    }),
                },
                None => step.handler.execute(&context).await,
            };

            execution.completed_at = Some(Utc::now());
            execution.duration_ms = Some(clock.elapsed().as_millis() as u64);
            execution.entities_committed = context.entities_committed();
            execution.relationships_committed = context.relationships_committed();
            execution.sibling_failures = context.sibling_failures();

            match result {
                Ok(()) => {
                    execution.status = StepStatus::Completed;
                    info!(
                        entities = execution.entities_committed,
                        relationships = execution.relationships_committed,
                        sibling_failures = execution.sibling_failures.len(),
                        duration_ms = execution.duration_ms,
                        "Step completed"
                    );
                }
                Err(err) => {
                    execution.status = StepStatus::Failed;
                    execution.endpoint = err
                        .endpoint()
                        .map(str::to_string)
                        .or_else(|| context.tracker().current());
                    execution.permission_denied = err.is_permission_denied();
                    execution.partial_data_retained =
                        execution.entities_committed + execution.relationships_committed > 0;
                    execution.error = Some(err.to_string());

                    error!(
                        error = %err,
                        endpoint = execution.endpoint.as_deref().unwrap_or("unknown"),
                        permission_denied = execution.permission_denied,
                        partial_data_retained = execution.partial_data_retained,
                        "Step failed"
                    );
                }
            }

            execution
        }
        .instrument(span)
        .await
    }
}
