mod common;

use common::{chain, extract_config, file, node, StubService, EXTRACT_BODY};
use doccore::{EngineError, ExecutionStatus, NodeKind};
use docruntime::{Runtime, RuntimeConfig};
use serde_json::json;
use std::sync::Arc;

fn extract_chain(id: &str) -> doccore::Workflow {
    chain(
        id,
        vec![
            node("in", NodeKind::Input),
            node(
                "extract",
                NodeKind::Uie {
                    config: extract_config(),
                },
            ),
            node("out", NodeKind::Output),
        ],
    )
}

#[tokio::test]
async fn execute_reports_success_and_records_history() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());
    let workflow_id = runtime.store().save(extract_chain("wf-exec")).await.id;

    let report = runtime
        .execute(&workflow_id, vec![file("a.pdf")], None)
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(report.request_id.starts_with("req-"));
    assert_eq!(report.total_files, Some(1));
    assert_eq!(report.processed_files, Some(1));
    assert_eq!(report.result, Some(json!({"invoice_no": "INV-001"})));
    assert!(report.error.is_none());

    let record = runtime.execution(&report.request_id).await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert_eq!(record.merged_result, Some(json!({"invoice_no": "INV-001"})));

    let by_workflow = runtime.executions_for(&workflow_id).await;
    assert_eq!(by_workflow.len(), 1);
    assert_eq!(by_workflow[0].request_id, report.request_id);
}

#[tokio::test]
async fn unknown_workflow_is_not_found() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());

    let err = runtime
        .execute("wf-ghost", vec![], None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WorkflowNotFound(_)));
}

#[tokio::test]
async fn engine_failure_becomes_a_failed_report() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());
    // extract node with no URL configured
    let workflow = chain(
        "wf-broken",
        vec![
            node("in", NodeKind::Input),
            node(
                "extract",
                NodeKind::Uie {
                    config: Default::default(),
                },
            ),
            node("out", NodeKind::Output),
        ],
    );
    let workflow_id = runtime.store().save(workflow).await.id;

    let report = runtime
        .execute(&workflow_id, vec![file("a.pdf")], None)
        .await
        .unwrap();

    assert_eq!(report.status, ExecutionStatus::Failed);
    assert!(report.error.as_deref().unwrap().contains("URL"));
    assert!(report.result.is_none());

    // the failure is recorded against the run before it surfaces
    let record = runtime.execution(&report.request_id).await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.error.is_some());
    assert!(record.ended_at.is_some());
}

#[tokio::test]
async fn caller_supplied_request_id_is_used() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());
    let workflow_id = runtime.store().save(extract_chain("wf-rid")).await.id;

    let report = runtime
        .execute(&workflow_id, vec![file("a.pdf")], Some("req-cli-7".into()))
        .await
        .unwrap();
    assert_eq!(report.request_id, "req-cli-7");
    assert!(runtime.execution("req-cli-7").await.is_some());
}

#[tokio::test]
async fn run_without_produced_value_reports_empty_object() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());
    let workflow = chain(
        "wf-passthrough",
        vec![node("in", NodeKind::Input), node("out", NodeKind::Output)],
    );
    let workflow_id = runtime.store().save(workflow).await.id;

    let report = runtime.execute(&workflow_id, vec![], None).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.result, Some(json!({})));
}

#[tokio::test]
async fn preview_runs_only_the_extract_call() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());
    let workflow_id = runtime.store().save(extract_chain("wf-preview")).await.id;

    let result = runtime
        .preview(&workflow_id, Some(file("sample.pdf")))
        .await
        .unwrap();
    assert_eq!(result, json!({"invoice_no": "INV-001"}));

    // previews never enter the execution history
    assert!(runtime.executions().await.is_empty());
}

#[tokio::test]
async fn store_generates_ids_for_blank_workflows() {
    let service = Arc::new(StubService::with_body(EXTRACT_BODY));
    let runtime = Runtime::new(service, RuntimeConfig::default());

    let mut workflow = extract_chain("ignored");
    workflow.id = String::new();
    let saved = runtime.store().save(workflow).await;
    assert!(saved.id.starts_with("wf-"));
    assert!(runtime.store().find(&saved.id).await.is_some());
}
