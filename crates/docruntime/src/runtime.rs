use crate::store::{MemoryWorkflowStore, WorkflowStore};
use crate::walker::GraphWalker;
use doccore::{
    EngineError, ExecutionHistory, ExecutionRecord, ExecutionStatus, Result, UploadedFile,
};
use docnodes::DocumentService;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Ties the pieces together: workflow store, execution history, the
/// extraction service client, and the process-wide worker pool every run
/// shares.
pub struct Runtime {
    store: Arc<dyn WorkflowStore>,
    history: Arc<ExecutionHistory>,
    walker: GraphWalker,
}

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Size of the fixed worker pool bounding simultaneous extraction calls
    /// across all concurrently executing workflows.
    pub max_concurrent_calls: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 10,
        }
    }
}

impl Runtime {
    pub fn new(service: Arc<dyn DocumentService>, config: RuntimeConfig) -> Self {
        Self::with_store(Arc::new(MemoryWorkflowStore::new()), service, config)
    }

    pub fn with_store(
        store: Arc<dyn WorkflowStore>,
        service: Arc<dyn DocumentService>,
        config: RuntimeConfig,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self {
            store,
            history: Arc::new(ExecutionHistory::new()),
            walker: GraphWalker::new(service, pool),
        }
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Execute a stored workflow against an uploaded file set.
    ///
    /// Engine failures terminate the run as FAILED and come back inside the
    /// report; `Err` is reserved for unknown workflow ids. Either way the
    /// run is recorded in history before this returns.
    pub async fn execute(
        &self,
        workflow_id: &str,
        files: Vec<UploadedFile>,
        request_id: Option<String>,
    ) -> Result<ExecutionReport> {
        let workflow = self
            .store
            .find(workflow_id)
            .await
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        let ctx = self
            .history
            .create(request_id, workflow_id, files.len())
            .await;
        tracing::info!(
            "executing workflow {} as {} ({} files)",
            workflow_id,
            ctx.request_id,
            files.len()
        );

        match self.walker.run(&workflow, &files, &ctx).await {
            Ok(result) => {
                // a run can legitimately end with no produced value
                let result = if result.is_null() { json!({}) } else { result };
                ctx.mark_success(result.clone()).await;
                tracing::info!(
                    "execution {} succeeded ({}/{} files)",
                    ctx.request_id,
                    ctx.processed_files(),
                    ctx.total_files
                );
                Ok(ExecutionReport {
                    request_id: ctx.request_id.clone(),
                    status: ExecutionStatus::Success,
                    total_files: Some(ctx.total_files),
                    processed_files: Some(ctx.processed_files()),
                    result: Some(result),
                    error: None,
                })
            }
            Err(e) => {
                ctx.mark_failed(e.to_string()).await;
                tracing::error!("execution {} failed: {}", ctx.request_id, e);
                Ok(ExecutionReport {
                    request_id: ctx.request_id.clone(),
                    status: ExecutionStatus::Failed,
                    total_files: None,
                    processed_files: None,
                    result: None,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Run the workflow only as far as its first extract node and return
    /// that call's parsed result.
    pub async fn preview(&self, workflow_id: &str, file: Option<UploadedFile>) -> Result<Value> {
        let workflow = self
            .store
            .find(workflow_id)
            .await
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;
        self.walker.preview(&workflow, file.as_ref()).await
    }

    pub async fn executions(&self) -> Vec<ExecutionRecord> {
        self.history.all().await
    }

    pub async fn execution(&self, request_id: &str) -> Option<ExecutionRecord> {
        match self.history.find(request_id).await {
            Some(ctx) => Some(ctx.snapshot().await),
            None => None,
        }
    }

    pub async fn executions_for(&self, workflow_id: &str) -> Vec<ExecutionRecord> {
        self.history.for_workflow(workflow_id).await
    }
}

/// Caller-facing summary of one execution request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub request_id: String,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}
