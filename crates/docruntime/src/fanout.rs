use crate::walker::require_url;
use doccore::{
    EngineError, ExecutionContext, ExtractConfig, NodeKind, Result, SplitterConfig, UploadedFile,
    Workflow,
};
use docnodes::{parse_response, DocumentService};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Run one extraction call per file against the extract node paired with the
/// splitter, concurrently, and return the per-file entries ordered by
/// original submission index.
///
/// Failures are isolated per file: a failed call or parse becomes an
/// `_error` entry and never aborts the batch. The shared pool bounds
/// simultaneous calls across all runs; `max_parallel`, when set, caps this
/// run on top of it. All tasks run to completion before this returns — no
/// early continuation, no cancellation, no timeout.
pub(crate) async fn fan_out(
    service: &Arc<dyn DocumentService>,
    pool: &Arc<Semaphore>,
    workflow: &Workflow,
    splitter_id: &str,
    config: &SplitterConfig,
    files: &[UploadedFile],
    ctx: &Arc<ExecutionContext>,
) -> Result<Value> {
    if files.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    // the splitter pairs with the extract node immediately after it
    let extract_id = workflow.next_node_id(splitter_id).ok_or_else(|| {
        EngineError::Config("splitter must be followed by an extract node".into())
    })?;
    let extract_node = workflow
        .find_node(extract_id)
        .ok_or_else(|| EngineError::Graph(format!("node not found: {}", extract_id)))?;
    let NodeKind::Uie {
        config: extract_config,
    } = &extract_node.kind
    else {
        return Err(EngineError::Config(format!(
            "splitter must be followed by an extract node, found: {}",
            extract_node.kind.name()
        )));
    };
    require_url(extract_config)?;

    let run_cap = match config.max_parallel {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };

    let mut tasks = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let service = Arc::clone(service);
        let pool = Arc::clone(pool);
        let run_cap = run_cap.clone();
        let ctx = Arc::clone(ctx);
        let extract_config = extract_config.clone();
        let file = file.clone();
        tasks.push(tokio::spawn(async move {
            let _run_permit = match &run_cap {
                Some(cap) => Some(cap.acquire().await.expect("run cap closed")),
                None => None,
            };
            let _pool_permit = pool.acquire().await.expect("worker pool closed");
            extract_one(service.as_ref(), &extract_config, &file, index, &ctx).await
        }));
    }

    // join barrier: every task completes before the merger runs
    let joined = futures::future::join_all(tasks).await;
    let mut entries = Vec::with_capacity(joined.len());
    for ((index, file), outcome) in files.iter().enumerate().zip(joined) {
        match outcome {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::error!("fan-out task for file {} aborted: {}", index, e);
                entries.push(error_entry(index, &file.name, &format!("task aborted: {}", e)));
            }
        }
    }
    entries.sort_by_key(|entry| entry.get("_fileIndex").and_then(Value::as_u64).unwrap_or(0));

    ctx.append_file_results(&entries).await;
    Ok(Value::Array(entries))
}

/// One file's call + parse, wrapped with its submission metadata.
async fn extract_one(
    service: &dyn DocumentService,
    config: &ExtractConfig,
    file: &UploadedFile,
    index: usize,
    ctx: &ExecutionContext,
) -> Value {
    let parsed = match service.extract(config, Some(file)).await {
        Ok(body) => parse_response(&body, config),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(parsed) => {
            ctx.increment_processed();
            let mut entry = metadata_entry(index, &file.name);
            match parsed {
                Value::Object(map) => entry.extend(map),
                other => {
                    entry.insert("data".to_string(), other);
                }
            }
            Value::Object(entry)
        }
        Err(e) => {
            tracing::warn!("extraction failed for file {} ({}): {}", index, file.name, e);
            error_entry(index, &file.name, &e.to_string())
        }
    }
}

fn metadata_entry(index: usize, file_name: &str) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("_fileIndex".to_string(), Value::from(index as u64));
    entry.insert("_fileName".to_string(), Value::String(file_name.to_string()));
    entry
}

fn error_entry(index: usize, file_name: &str, message: &str) -> Value {
    let mut entry = metadata_entry(index, file_name);
    entry.insert("_error".to_string(), Value::String(message.to_string()));
    Value::Object(entry)
}
