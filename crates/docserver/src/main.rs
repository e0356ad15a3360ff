use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use doccore::{EngineError, UploadedFile, Workflow};
use docnodes::HttpDocumentService;
use docruntime::{Runtime, RuntimeConfig};
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<Runtime>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "docflow"
    }))
}

/// List all workflows
#[get("/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let workflows = data.runtime.store().list().await;
    Ok(HttpResponse::Ok().json(workflows))
}

/// Create a new workflow (a blank id gets generated)
#[post("/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let workflow = data.runtime.store().save(workflow.into_inner()).await;
    info!("created workflow: {} ({})", workflow.name, workflow.id);
    Ok(HttpResponse::Created().json(workflow))
}

/// Get a specific workflow
#[get("/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    match data.runtime.store().find(&workflow_id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Ok(not_found(&workflow_id)),
    }
}

/// Replace a workflow definition
#[actix_web::put("/workflows/{id}")]
async fn update_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    if data.runtime.store().find(&workflow_id).await.is_none() {
        return Ok(not_found(&workflow_id));
    }
    let mut workflow = workflow.into_inner();
    workflow.id = workflow_id;
    let workflow = data.runtime.store().save(workflow).await;
    Ok(HttpResponse::Ok().json(workflow))
}

/// Delete a workflow
#[actix_web::delete("/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    if data.runtime.store().delete(&workflow_id).await {
        info!("deleted workflow: {}", workflow_id);
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(not_found(&workflow_id))
    }
}

/// Execute a workflow against the uploaded file set
#[post("/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    let (files, request_id) = read_upload(payload).await?;

    match data.runtime.execute(&workflow_id, files, request_id).await {
        Ok(report) if report.is_success() => Ok(HttpResponse::Ok().json(report)),
        Ok(report) => {
            error!(
                "execution {} failed: {}",
                report.request_id,
                report.error.as_deref().unwrap_or("unknown")
            );
            Ok(HttpResponse::InternalServerError().json(report))
        }
        Err(EngineError::WorkflowNotFound(id)) => Ok(not_found(&id)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        })),
    }
}

/// Run the workflow only as far as its first extract node; used to configure
/// transform mappings against a real sample response
#[post("/workflows/{id}/preview")]
async fn preview_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    let (files, _) = read_upload(payload).await?;

    match data
        .runtime
        .preview(&workflow_id, files.into_iter().next())
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(EngineError::WorkflowNotFound(id)) => Ok(not_found(&id)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        })),
    }
}

/// List every execution started in this process
#[get("/executions")]
async fn list_executions(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.runtime.executions().await))
}

/// Fetch one execution by request id
#[get("/executions/{requestId}")]
async fn get_execution(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let request_id = path.into_inner();
    match data.runtime.execution(&request_id).await {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("execution {} not found", request_id),
        })),
    }
}

/// Executions of one workflow, newest first
#[get("/workflows/{id}/executions")]
async fn list_workflow_executions(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    Ok(HttpResponse::Ok().json(data.runtime.executions_for(&workflow_id).await))
}

fn not_found(workflow_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: format!("workflow {} not found", workflow_id),
    })
}

/// Drain a multipart upload into file blobs plus the optional caller-supplied
/// request id. Any part carrying a filename counts as a file.
async fn read_upload(mut payload: Multipart) -> ActixResult<(Vec<UploadedFile>, Option<String>)> {
    let mut files = Vec::new();
    let mut request_id = None;

    while let Some(mut field) = payload.try_next().await? {
        let field_name = field.name().to_string();
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(|name| name.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
        }

        if let Some(file_name) = file_name {
            files.push(UploadedFile::new(file_name, data));
        } else if field_name == "requestId" {
            request_id = Some(String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok((files, request_id))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("starting document pipeline server");

    let service = Arc::new(HttpDocumentService::new());
    let runtime = Arc::new(Runtime::new(service, RuntimeConfig::default()));

    let app_state = web::Data::new(AppState { runtime });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_workflows)
            .service(create_workflow)
            .service(get_workflow)
            .service(update_workflow)
            .service(delete_workflow)
            .service(execute_workflow)
            .service(preview_workflow)
            .service(list_executions)
            .service(get_execution)
            .service(list_workflow_executions)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
