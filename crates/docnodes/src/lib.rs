//! Per-node-kind behaviors
//!
//! The extraction-service client seam, the response parser, the field
//! transformer, and the sheet-sink payload builder. No control flow lives
//! here; the walker in docruntime drives these.

mod parse;
mod service;
mod sheets;
mod transform;

pub use parse::parse_response;
pub use service::{DocumentService, HttpDocumentService};
pub use sheets::sheet_payload;
pub use transform::transform;
