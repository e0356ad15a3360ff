//! Pipeline execution engine
//!
//! Sequential graph walking with one fan-out/fan-in region, the merge
//! strategies, and the runtime facade tying store, history, and the
//! extraction client together.

mod fanout;
mod merge;
mod runtime;
mod store;
mod walker;

pub use merge::merge;
pub use runtime::{ExecutionReport, Runtime, RuntimeConfig};
pub use store::{MemoryWorkflowStore, WorkflowStore};
pub use walker::GraphWalker;
