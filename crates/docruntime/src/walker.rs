use doccore::{
    EngineError, ExecutionContext, ExtractConfig, NodeKind, Result, UploadedFile, Workflow,
};
use docnodes::{parse_response, sheet_payload, transform, DocumentService};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Drives one run through the graph: a sequential chain walk with exhaustive
/// dispatch per node kind, plus the splitter→merger fan-out region.
///
/// The walk performs no cycle detection; callers own acyclicity. Nodes with
/// several outgoing edges follow whichever edge comes first.
pub struct GraphWalker {
    service: Arc<dyn DocumentService>,
    pool: Arc<Semaphore>,
}

impl GraphWalker {
    /// `pool` is the process-wide cap on simultaneous extraction calls,
    /// shared across every concurrently executing run.
    pub fn new(service: Arc<dyn DocumentService>, pool: Arc<Semaphore>) -> Self {
        Self { service, pool }
    }

    /// Walk the chain from the input node until an output node or a fatal
    /// error, returning the final result.
    pub async fn run(
        &self,
        workflow: &Workflow,
        files: &[UploadedFile],
        ctx: &Arc<ExecutionContext>,
    ) -> Result<Value> {
        let mut current_id = input_node(workflow)?.to_string();
        let mut result = Value::Null;

        loop {
            let node = workflow
                .find_node(&current_id)
                .ok_or_else(|| EngineError::Graph(format!("node not found: {}", current_id)))?;
            tracing::debug!("dispatching node {} ({})", node.id, node.kind.name());

            match &node.kind {
                NodeKind::Input => {}
                NodeKind::Output => break,
                NodeKind::Splitter { config } => {
                    result = crate::fanout::fan_out(
                        &self.service,
                        &self.pool,
                        workflow,
                        &node.id,
                        config,
                        files,
                        ctx,
                    )
                    .await?;
                    // resume at the nearest downstream merger; the nodes in
                    // between are never dispatched individually. Without a
                    // merger the fan-out sequence is the final result.
                    match find_merger(workflow, &node.id)? {
                        Some(merger_id) => {
                            current_id = merger_id;
                            continue;
                        }
                        None => return Ok(result),
                    }
                }
                NodeKind::Merger { config } => {
                    result = crate::merge::merge(result, config);
                }
                NodeKind::Uie { config } => {
                    require_url(config)?;
                    // single-file mode takes the first file of the set
                    let body = self.service.extract(config, files.first()).await?;
                    result = parse_response(&body, config)?;
                    ctx.increment_processed();
                }
                NodeKind::Transform { config } => {
                    if result.is_null() {
                        return Err(EngineError::Precondition(
                            "transform node requires a preceding result".into(),
                        ));
                    }
                    result = transform(result, config)?;
                }
                NodeKind::Connector { config } => {
                    if config.connector_type == "http" {
                        if let Some(url) = configured_url(config.url.as_deref()) {
                            self.service
                                .post_json(url, config.method(), &config.headers, &result)
                                .await?;
                        }
                    }
                }
                NodeKind::Sheets { config } => {
                    if let Some(url) = configured_url(config.webhook_url.as_deref()) {
                        let payload = sheet_payload(config, &result);
                        if let Err(e) = self
                            .service
                            .post_json(url, "POST", &HashMap::new(), &payload)
                            .await
                        {
                            tracing::warn!("sheet export failed, continuing: {}", e);
                        }
                    }
                }
            }

            ctx.record_node_result(&node.id, result.clone()).await;
            match workflow.next_node_id(&current_id) {
                Some(next) => current_id = next.to_string(),
                None => break,
            }
        }

        Ok(result)
    }

    /// Walk until the first extract node, run its call + parse, and return
    /// that result directly. Used to configure transform mappings against a
    /// real sample. A transform, connector, or output node reached first
    /// yields null.
    pub async fn preview(
        &self,
        workflow: &Workflow,
        file: Option<&UploadedFile>,
    ) -> Result<Value> {
        let mut current_id = input_node(workflow)?.to_string();

        loop {
            let node = workflow
                .find_node(&current_id)
                .ok_or_else(|| EngineError::Graph(format!("node not found: {}", current_id)))?;

            match &node.kind {
                NodeKind::Uie { config } => {
                    require_url(config)?;
                    let body = self.service.extract(config, file).await?;
                    return parse_response(&body, config);
                }
                NodeKind::Transform { .. } | NodeKind::Connector { .. } | NodeKind::Output => {
                    return Ok(Value::Null);
                }
                _ => {}
            }

            match workflow.next_node_id(&current_id) {
                Some(next) => current_id = next.to_string(),
                None => return Ok(Value::Null),
            }
        }
    }
}

fn input_node(workflow: &Workflow) -> Result<&str> {
    workflow
        .input_node_id()
        .ok_or_else(|| EngineError::Config("workflow has no input node".into()))
}

pub(crate) fn require_url(config: &ExtractConfig) -> Result<()> {
    match configured_url(config.url.as_deref()) {
        Some(_) => Ok(()),
        None => Err(EngineError::Config(
            "extract node has no URL configured".into(),
        )),
    }
}

fn configured_url(url: Option<&str>) -> Option<&str> {
    url.filter(|u| !u.trim().is_empty())
}

/// Follow edges forward from the splitter to the nearest merger node.
fn find_merger(workflow: &Workflow, splitter_id: &str) -> Result<Option<String>> {
    let mut next = workflow.next_node_id(splitter_id);
    while let Some(id) = next {
        let node = workflow
            .find_node(id)
            .ok_or_else(|| EngineError::Graph(format!("node not found: {}", id)))?;
        if matches!(node.kind, NodeKind::Merger { .. }) {
            return Ok(Some(id.to_string()));
        }
        next = workflow.next_node_id(id);
    }
    Ok(None)
}
