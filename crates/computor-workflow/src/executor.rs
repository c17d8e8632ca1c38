//! An in-process [`WorkflowEngine`]: workflow state is an append-only
//! event log per `workflow_id`, mirroring the append/derive-state
//! pattern used elsewhere in this workspace for auditable history
//! (`DeploymentHistory`) rather than any particular durable-execution
//! product's wire protocol. A production deployment swaps this module
//! for an adapter to a real durable-execution runtime without
//! touching the [`WorkflowEngine`] trait or any workflow body.

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use computor_core::error::ComputorError;
use dashmap::DashMap;
use serde_json::Value;
use tracing::Instrument;

use crate::activity::{cancel_pair, CancelHandle, CancelToken};
use crate::engine::{WorkflowEngine, WorkflowQueryResult, WorkflowSignal, WorkflowStatus};

pub type WorkflowFuture = Pin<Box<dyn std::future::Future<Output = Result<Value, ComputorError>> + Send>>;
pub type WorkflowFn = Arc<dyn Fn(Value, CancelToken) -> WorkflowFuture + Send + Sync>;

#[derive(Debug, Clone)]
enum WorkflowEvent {
    Submitted { at: DateTime<Utc>, task_queue: String },
    Completed { at: DateTime<Utc>, result: Value },
    Failed { at: DateTime<Utc>, error: String },
    Canceled { at: DateTime<Utc> },
}

#[derive(Default)]
struct WorkflowRecord {
    events: Vec<WorkflowEvent>,
}

impl WorkflowRecord {
    fn status(&self) -> WorkflowQueryResult {
        match self.events.last() {
            None | Some(WorkflowEvent::Submitted { .. }) => WorkflowQueryResult {
                status: WorkflowStatus::Running,
                result: None,
                error: None,
            },
            Some(WorkflowEvent::Completed { result, .. }) => WorkflowQueryResult {
                status: WorkflowStatus::Completed,
                result: Some(result.clone()),
                error: None,
            },
            Some(WorkflowEvent::Failed { error, .. }) => WorkflowQueryResult {
                status: WorkflowStatus::Failed,
                result: None,
                error: Some(error.clone()),
            },
            Some(WorkflowEvent::Canceled { .. }) => WorkflowQueryResult {
                status: WorkflowStatus::Canceled,
                result: None,
                error: None,
            },
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.status().status, WorkflowStatus::Running)
    }
}

/// Per-process registry of workflow implementations (§9 "per-process
/// init registers workflow and activity implementations with DWE").
/// `shutdown` drains in-flight activities by waiting for every
/// spawned workflow task to observe cancellation and return.
pub struct DurableExecutor {
    handlers: DashMap<String, WorkflowFn>,
    workflows: Arc<DashMap<String, WorkflowRecord>>,
    cancels: DashMap<String, CancelHandle>,
    handles: std::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl Default for DurableExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableExecutor {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            workflows: Arc::new(DashMap::new()),
            cancels: DashMap::new(),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn register_handler(&self, task_queue: impl Into<String>, handler: WorkflowFn) {
        self.handlers.insert(task_queue.into(), handler);
    }

    /// Waits for every in-flight workflow task spawned by this
    /// executor to finish, after signaling cancellation to each
    /// (§9 "shutdown drains in-flight activities").
    pub async fn shutdown(&self) {
        for entry in self.cancels.iter() {
            entry.value().cancel();
        }
        let drained: Vec<_> = std::mem::take(&mut *self.handles.lock().expect("handles lock poisoned"));
        for handle in drained {
            let _ = handle.await;
        }
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for DurableExecutor {
    async fn submit(&self, workflow_id: &str, task_queue: &str, input: Value) -> Result<(), ComputorError> {
        if let Some(existing) = self.workflows.get(workflow_id) {
            if existing.is_running() {
                return Err(ComputorError::Conflict(format!(
                    "workflow `{workflow_id}` is already running"
                )));
            }
        }

        let handler = self
            .handlers
            .get(task_queue)
            .ok_or_else(|| ComputorError::Validation(format!("no workflow registered for task queue `{task_queue}`")))?
            .clone();

        let (cancel_handle, cancel_token) = cancel_pair();
        self.cancels.insert(workflow_id.to_string(), cancel_handle);
        self.workflows.insert(
            workflow_id.to_string(),
            WorkflowRecord {
                events: vec![WorkflowEvent::Submitted {
                    at: Utc::now(),
                    task_queue: task_queue.to_string(),
                }],
            },
        );

        let workflows = self.workflows.clone();
        let id = workflow_id.to_string();

        let handle = tokio::spawn(
            async move {
                let outcome = handler(input, cancel_token).await;
                if let Some(mut record) = workflows.get_mut(&id) {
                    let event = match outcome {
                        Ok(result) => WorkflowEvent::Completed { at: Utc::now(), result },
                        Err(ComputorError::CancelRequested(_)) => WorkflowEvent::Canceled { at: Utc::now() },
                        Err(err) => WorkflowEvent::Failed {
                            at: Utc::now(),
                            error: err.to_string(),
                        },
                    };
                    record.events.push(event);
                }
            }
            .instrument(tracing::info_span!("workflow", workflow_id = workflow_id)),
        );
        self.handles.lock().expect("handles lock poisoned").push(handle);

        Ok(())
    }

    async fn signal(&self, workflow_id: &str, signal: WorkflowSignal) -> Result<(), ComputorError> {
        match signal {
            WorkflowSignal::Cancel => {
                let handle = self
                    .cancels
                    .get(workflow_id)
                    .ok_or_else(|| ComputorError::NotFound(format!("workflow `{workflow_id}`")))?;
                handle.cancel();
                Ok(())
            }
        }
    }

    async fn query(&self, workflow_id: &str) -> Result<WorkflowQueryResult, ComputorError> {
        self.workflows
            .get(workflow_id)
            .map(|record| record.status())
            .ok_or_else(|| ComputorError::NotFound(format!("workflow `{workflow_id}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WorkflowStatus;
    use std::time::Duration;

    fn instant_handler(value: Value) -> WorkflowFn {
        Arc::new(move |_input, _cancel| {
            let value = value.clone();
            Box::pin(async move { Ok(value) })
        })
    }

    #[tokio::test]
    async fn submit_then_query_reaches_completed() {
        let executor = DurableExecutor::new();
        executor.register_handler("hierarchy", instant_handler(serde_json::json!({"ok": true})));

        executor
            .submit("deploy-course-1", "hierarchy", serde_json::json!({}))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let status = executor.query("deploy-course-1").await.unwrap();
        assert_eq!(status.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn duplicate_submit_while_running_is_a_conflict() {
        let executor = DurableExecutor::new();
        executor.register_handler(
            "hierarchy",
            Arc::new(|_input, _cancel| Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(serde_json::json!({}))
            })),
        );

        executor
            .submit("deploy-course-1", "hierarchy", serde_json::json!({}))
            .await
            .unwrap();
        let result = executor.submit("deploy-course-1", "hierarchy", serde_json::json!({})).await;
        assert!(matches!(result, Err(ComputorError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_workflow_id_is_not_found() {
        let executor = DurableExecutor::new();
        let result = executor.query("missing").await;
        assert!(matches!(result, Err(ComputorError::NotFound(_))));
    }
}
