//! Durable Workflow Engine Adapter (DWE, §4.5): the `WorkflowEngine`
//! contract, idempotent activity execution with retries/timeouts/
//! heartbeats, and an in-process reference implementation.

pub mod activity;
pub mod engine;
pub mod executor;

pub use activity::{cancel_pair, ActivityContext, CancelHandle, CancelToken};
pub use engine::{derive_workflow_id, WorkflowEngine, WorkflowQueryResult, WorkflowSignal, WorkflowStatus};
pub use executor::{DurableExecutor, WorkflowFn, WorkflowFuture};
