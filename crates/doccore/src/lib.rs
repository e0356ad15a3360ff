//! Core types for the document pipeline engine
//!
//! This crate provides the graph model, node configurations, error taxonomy,
//! and per-run execution records that all other components depend on.

mod error;
mod execution;
mod file;
mod workflow;

pub use error::{EngineError, Result};
pub use execution::{ExecutionContext, ExecutionHistory, ExecutionRecord, ExecutionStatus};
pub use file::UploadedFile;
pub use workflow::{
    ConnectorConfig, Edge, ExtractConfig, FieldMapping, MergerConfig, NodeKind, SheetSinkConfig,
    SplitterConfig, TransformConfig, Workflow, WorkflowNode,
};
