use async_trait::async_trait;
use doccore::Workflow;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keyed store for workflow definitions. The engine needs exactly these
/// operations; durability is a property of the implementation behind the
/// trait.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn list(&self) -> Vec<Workflow>;
    async fn find(&self, id: &str) -> Option<Workflow>;
    /// Persist a definition, assigning a `wf-` id when the given one is
    /// blank. Returns the stored workflow.
    async fn save(&self, workflow: Workflow) -> Workflow;
    async fn delete(&self, id: &str) -> bool;
}

/// Process-lifetime in-memory store. Definitions live exactly as long as
/// the process; nothing is evicted or persisted.
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn list(&self) -> Vec<Workflow> {
        self.workflows.read().await.values().cloned().collect()
    }

    async fn find(&self, id: &str) -> Option<Workflow> {
        self.workflows.read().await.get(id).cloned()
    }

    async fn save(&self, mut workflow: Workflow) -> Workflow {
        if workflow.id.trim().is_empty() {
            workflow.id = format!("wf-{}", Uuid::new_v4());
        }
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id.clone(), workflow.clone());
        workflow
    }

    async fn delete(&self, id: &str) -> bool {
        self.workflows.write().await.remove(id).is_some()
    }
}
