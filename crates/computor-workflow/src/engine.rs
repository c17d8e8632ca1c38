//! The DWE adapter's contract (§4.5): submit/signal/query/cancel over
//! a `workflow_id` stable across retries and process restarts. This
//! trait is the seam a production deployment would implement against
//! a real durable-execution runtime; [`crate::executor::DurableExecutor`]
//! is the in-process reference implementation this workspace ships.

use async_trait::async_trait;
use computor_core::error::ComputorError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct WorkflowQueryResult {
    pub status: WorkflowStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum WorkflowSignal {
    Cancel,
}

/// A `workflow_id` derived from its target resource (e.g.
/// `deploy-course-<course_id>`), so that per-resource ordering falls
/// out of id uniqueness rather than explicit locking (§4.5).
pub fn derive_workflow_id(kind: &str, resource_id: impl std::fmt::Display) -> String {
    format!("{kind}-{resource_id}")
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Submits a workflow under `workflow_id` with the given input.
    /// Rejects with `Conflict` if a workflow under the same id is
    /// already running — the start-if-exists rule that gives each
    /// resource its own serialization point (§4.5, §8 "Workflow
    /// uniqueness").
    async fn submit(&self, workflow_id: &str, task_queue: &str, input: Value) -> Result<(), ComputorError>;

    async fn signal(&self, workflow_id: &str, signal: WorkflowSignal) -> Result<(), ComputorError>;

    async fn query(&self, workflow_id: &str) -> Result<WorkflowQueryResult, ComputorError>;

    async fn cancel(&self, workflow_id: &str) -> Result<(), ComputorError> {
        self.signal(workflow_id, WorkflowSignal::Cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_stable_per_resource_ids() {
        assert_eq!(derive_workflow_id("deploy-course", 42), "deploy-course-42");
    }
}
