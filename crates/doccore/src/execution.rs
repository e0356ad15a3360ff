use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of a single run. Terminal states are reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// Mutable per-run record. The processed-files counter is incremented by
/// concurrent fan-out tasks; everything else is written by the walker on the
/// run's own control flow, with per-file results appended after the fan-out
/// join barrier.
#[derive(Debug)]
pub struct ExecutionContext {
    pub request_id: String,
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    pub total_files: usize,
    processed: AtomicUsize,
    state: RwLock<RunState>,
}

#[derive(Debug, Default)]
struct RunState {
    status: Option<TerminalState>,
    node_results: HashMap<String, Value>,
    file_results: Vec<Value>,
}

#[derive(Debug)]
struct TerminalState {
    status: ExecutionStatus,
    ended_at: DateTime<Utc>,
    error: Option<String>,
    merged_result: Option<Value>,
}

impl ExecutionContext {
    /// Allocate a RUNNING context. A missing request id gets a generated
    /// `req-` id.
    pub fn start(request_id: Option<String>, workflow_id: &str, total_files: usize) -> Self {
        let request_id = request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()));
        Self {
            request_id,
            workflow_id: workflow_id.to_string(),
            started_at: Utc::now(),
            total_files,
            processed: AtomicUsize::new(0),
            state: RwLock::new(RunState::default()),
        }
    }

    /// Safe to call from concurrently running fan-out tasks.
    pub fn increment_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_files(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub async fn record_node_result(&self, node_id: &str, result: Value) {
        let mut state = self.state.write().await;
        state.node_results.insert(node_id.to_string(), result);
    }

    /// Store the ordered per-file fan-out entries. Called once per splitter
    /// region, after every task has completed.
    pub async fn append_file_results(&self, entries: &[Value]) {
        let mut state = self.state.write().await;
        state.file_results.extend(entries.iter().cloned());
    }

    /// Transition to SUCCESS. Ignored if the run already terminated.
    pub async fn mark_success(&self, result: Value) {
        let mut state = self.state.write().await;
        if state.status.is_none() {
            state.status = Some(TerminalState {
                status: ExecutionStatus::Success,
                ended_at: Utc::now(),
                error: None,
                merged_result: Some(result),
            });
        }
    }

    /// Transition to FAILED. Ignored if the run already terminated.
    pub async fn mark_failed(&self, error: impl Into<String>) {
        let mut state = self.state.write().await;
        if state.status.is_none() {
            state.status = Some(TerminalState {
                status: ExecutionStatus::Failed,
                ended_at: Utc::now(),
                error: Some(error.into()),
                merged_result: None,
            });
        }
    }

    pub async fn status(&self) -> ExecutionStatus {
        self.state
            .read()
            .await
            .status
            .as_ref()
            .map(|t| t.status)
            .unwrap_or(ExecutionStatus::Running)
    }

    /// Point-in-time serializable copy of the run.
    pub async fn snapshot(&self) -> ExecutionRecord {
        let state = self.state.read().await;
        let terminal = state.status.as_ref();
        ExecutionRecord {
            request_id: self.request_id.clone(),
            workflow_id: self.workflow_id.clone(),
            started_at: self.started_at,
            ended_at: terminal.map(|t| t.ended_at),
            status: terminal
                .map(|t| t.status)
                .unwrap_or(ExecutionStatus::Running),
            error: terminal.and_then(|t| t.error.clone()),
            total_files: self.total_files,
            processed_files: self.processed_files(),
            node_results: state.node_results.clone(),
            file_results: state.file_results.clone(),
            merged_result: terminal.and_then(|t| t.merged_result.clone()),
        }
    }
}

/// Serializable view of an execution, as returned by the history queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub request_id: String,
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_files: usize,
    pub processed_files: usize,
    pub node_results: HashMap<String, Value>,
    pub file_results: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_result: Option<Value>,
}

/// In-memory registry of every run started in this process, keyed by request
/// id. Retained for the process lifetime: no eviction and no persistence.
#[derive(Debug, Default)]
pub struct ExecutionHistory {
    executions: RwLock<HashMap<String, Arc<ExecutionContext>>>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        request_id: Option<String>,
        workflow_id: &str,
        total_files: usize,
    ) -> Arc<ExecutionContext> {
        let ctx = Arc::new(ExecutionContext::start(request_id, workflow_id, total_files));
        let mut executions = self.executions.write().await;
        executions.insert(ctx.request_id.clone(), Arc::clone(&ctx));
        ctx
    }

    pub async fn find(&self, request_id: &str) -> Option<Arc<ExecutionContext>> {
        self.executions.read().await.get(request_id).cloned()
    }

    pub async fn all(&self) -> Vec<ExecutionRecord> {
        let contexts: Vec<_> = self.executions.read().await.values().cloned().collect();
        let mut records = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            records.push(ctx.snapshot().await);
        }
        records
    }

    /// Runs for one workflow, newest start time first.
    pub async fn for_workflow(&self, workflow_id: &str) -> Vec<ExecutionRecord> {
        let mut records: Vec<_> = self
            .all()
            .await
            .into_iter()
            .filter(|r| r.workflow_id == workflow_id)
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }
}
