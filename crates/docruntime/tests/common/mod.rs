#![allow(dead_code)]

use async_trait::async_trait;
use doccore::{
    Edge, EngineError, ExtractConfig, NodeKind, Result, UploadedFile, Workflow, WorkflowNode,
};
use docnodes::DocumentService;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const EXTRACT_BODY: &str = r#"{"fields": [
    {"key": "invoice_no", "value": "INV-1", "refinedValue": "INV-001", "confidence": 0.98},
    {"key": "total", "value": "100", "confidence": 0.42}
]}"#;

/// Scripted stand-in for the extraction service and the connector /
/// sheet-sink targets.
#[derive(Default)]
pub struct StubService {
    /// Response body per file name; falls back to `default_body`.
    pub bodies: HashMap<String, String>,
    pub default_body: String,
    /// Artificial latency per file name, to force completion-order shuffles.
    pub delays_ms: HashMap<String, u64>,
    /// File names whose extraction call fails.
    pub fail: HashSet<String>,
    /// When set, every post_json call fails with this message.
    pub post_error: Option<String>,
    pub posts: Mutex<Vec<(String, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubService {
    pub fn with_body(body: &str) -> Self {
        Self {
            default_body: body.to_string(),
            ..Default::default()
        }
    }

    /// Highest number of extraction calls observed in flight at once.
    pub fn max_seen(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentService for StubService {
    async fn extract(
        &self,
        _config: &ExtractConfig,
        file: Option<&UploadedFile>,
    ) -> Result<String> {
        let name = file.map(|f| f.name.clone()).unwrap_or_default();
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(ms) = self.delays_ms.get(&name) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.contains(&name) {
            return Err(EngineError::ExternalCall(format!(
                "extraction refused {}",
                name
            )));
        }
        Ok(self
            .bodies
            .get(&name)
            .cloned()
            .unwrap_or_else(|| self.default_body.clone()))
    }

    async fn post_json(
        &self,
        url: &str,
        _method: &str,
        _headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<String> {
        if let Some(message) = &self.post_error {
            return Err(EngineError::ExternalCall(message.clone()));
        }
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        Ok(String::new())
    }
}

pub fn node(id: &str, kind: NodeKind) -> WorkflowNode {
    WorkflowNode {
        id: id.to_string(),
        label: String::new(),
        position_x: 0.0,
        position_y: 0.0,
        kind,
    }
}

/// Workflow whose edges chain the given nodes in order.
pub fn chain(id: &str, nodes: Vec<WorkflowNode>) -> Workflow {
    let edges = nodes
        .windows(2)
        .map(|pair| Edge {
            id: format!("{}-{}", pair[0].id, pair[1].id),
            source_node_id: pair[0].id.clone(),
            target_node_id: pair[1].id.clone(),
        })
        .collect();
    Workflow {
        id: id.to_string(),
        name: id.to_string(),
        nodes,
        edges,
    }
}

pub fn extract_config() -> ExtractConfig {
    ExtractConfig {
        url: Some("https://extract.example.com/v1".into()),
        min_confidence: Some(0.5),
        ..Default::default()
    }
}

pub fn file(name: &str) -> UploadedFile {
    UploadedFile::new(name, b"%PDF-1.7 test".to_vec())
}
