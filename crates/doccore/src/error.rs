use thiserror::Error;

/// Failures raised while resolving or executing a workflow graph.
///
/// Everything here aborts the run when it escapes the fan-out boundary;
/// inside fan-out, `ExternalCall` failures are captured per file instead.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A node is missing required configuration (blank URL, splitter not
    /// followed by an extract node, missing input node).
    #[error("configuration error: {0}")]
    Config(String),

    /// The edge set references a node id that does not exist.
    #[error("graph error: {0}")]
    Graph(String),

    /// Transport or HTTP failure talking to the extraction service or a
    /// connector target, or an unreadable response from either.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// A node was reached in a state it cannot handle (e.g. transform with
    /// no preceding result).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Lookup against the workflow store came up empty.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
