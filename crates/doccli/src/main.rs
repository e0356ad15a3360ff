use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use doccore::{NodeKind, UploadedFile, Workflow};
use docnodes::HttpDocumentService;
use docruntime::{Runtime, RuntimeConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docflow")]
#[command(about = "Document pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow against local files
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        workflow: PathBuf,

        /// Document file(s) to process, in submission order
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Caller-supplied request id
        #[arg(long)]
        request_id: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            workflow,
            file,
            request_id,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_workflow(workflow, file, request_id).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }
    }

    Ok(())
}

async fn run_workflow(
    workflow_path: PathBuf,
    file_paths: Vec<PathBuf>,
    request_id: Option<String>,
) -> Result<()> {
    let workflow = load_workflow(&workflow_path)?;
    println!("Workflow: {} ({} nodes)", workflow.name, workflow.nodes.len());

    let mut files = Vec::with_capacity(file_paths.len());
    for path in &file_paths {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        files.push(UploadedFile::new(name, data));
    }

    let service = Arc::new(HttpDocumentService::new());
    let runtime = Runtime::new(service, RuntimeConfig::default());
    let workflow_id = runtime.store().save(workflow).await.id;

    let report = runtime.execute(&workflow_id, files, request_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        bail!("execution failed");
    }
    Ok(())
}

fn validate_workflow(path: PathBuf) -> Result<()> {
    let workflow = load_workflow(&path)?;

    if workflow.input_node_id().is_none() {
        bail!("workflow has no input node");
    }
    for edge in &workflow.edges {
        for endpoint in [&edge.source_node_id, &edge.target_node_id] {
            if workflow.find_node(endpoint).is_none() {
                bail!("edge {} references unknown node: {}", edge.id, endpoint);
            }
        }
    }
    for node in &workflow.nodes {
        if let NodeKind::Splitter { .. } = node.kind {
            let paired = workflow
                .next_node_id(&node.id)
                .and_then(|id| workflow.find_node(id));
            match paired {
                Some(next) if matches!(next.kind, NodeKind::Uie { .. }) => {}
                _ => bail!("splitter {} must be followed by an extract node", node.id),
            }
        }
    }

    println!("Workflow is valid:");
    println!("  Name: {}", workflow.name);
    println!("  Nodes: {}", workflow.nodes.len());
    println!("  Edges: {}", workflow.edges.len());

    Ok(())
}

fn load_workflow(path: &PathBuf) -> Result<Workflow> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid workflow: {}", path.display()))
}
