use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete pipeline definition: a set of typed nodes plus the edges that
/// chain them. Immutable once handed to an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn find_node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First node of kind Input. Graphs with more than one input node are
    /// not a supported configuration; the first one found wins.
    pub fn input_node_id(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Input))
            .map(|n| n.id.as_str())
    }

    /// Target of the first outgoing edge of `source`. Nodes are expected to
    /// have at most one meaningful outgoing edge; with several, whichever
    /// comes first in the edge list is followed.
    pub fn next_node_id(&self, source: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.source_node_id == source)
            .map(|e| e.target_node_id.as_str())
    }
}

/// A single node: identity, display position, and the kind tag that selects
/// its configuration payload and execution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Closed set of node kinds. Dispatch over these is exhaustive matching;
/// there is no open node hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point; passes the uploaded file set through unchanged.
    Input,
    /// Calls the external field-extraction service and parses the response.
    Uie {
        #[serde(default)]
        config: ExtractConfig,
    },
    /// Reshapes the preceding result into a caller-defined structure.
    Transform {
        #[serde(default)]
        config: TransformConfig,
    },
    /// Posts the current result to an external endpoint as a side effect.
    Connector {
        #[serde(default)]
        config: ConnectorConfig,
    },
    /// Terminal node; the walk stops here and returns the current result.
    Output,
    /// Fans the file set out to one extraction call per file.
    Splitter {
        #[serde(default)]
        config: SplitterConfig,
    },
    /// Fans the per-file result sequence back in to a single value.
    Merger {
        #[serde(default)]
        config: MergerConfig,
    },
    /// Best-effort export of the current result to a spreadsheet webhook.
    #[serde(rename = "googlesheets")]
    Sheets {
        #[serde(default)]
        config: SheetSinkConfig,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Uie { .. } => "uie",
            NodeKind::Transform { .. } => "transform",
            NodeKind::Connector { .. } => "connector",
            NodeKind::Output => "output",
            NodeKind::Splitter { .. } => "splitter",
            NodeKind::Merger { .. } => "merger",
            NodeKind::Sheets { .. } => "googlesheets",
        }
    }
}

/// Directed connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
}

/// Extraction node settings: the HTTP call plus how to filter and shape the
/// service response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractConfig {
    /// Extraction service endpoint. Required; a blank value fails the run.
    pub url: Option<String>,
    /// HTTP method, POST when unset.
    pub method: Option<String>,
    /// Auxiliary multipart form fields sent with every call.
    pub form_fields: HashMap<String, String>,
    /// Multipart field name for the file part, "file" when unset.
    pub file_field_name: Option<String>,
    /// Allow-list of field keys to keep; empty keeps everything.
    pub selected_keys: Vec<String>,
    /// Response shape: "flat_keyvalue" (default), "full", or "fields_only".
    pub output_format: Option<String>,
    /// Key renames applied wherever a field key is emitted.
    pub key_mappings: HashMap<String, String>,
    /// Drop fields whose confidence falls below this value.
    pub min_confidence: Option<f64>,
}

impl ExtractConfig {
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("POST")
    }

    pub fn file_field_name(&self) -> &str {
        self.file_field_name.as_deref().unwrap_or("file")
    }

    pub fn output_format(&self) -> &str {
        self.output_format.as_deref().unwrap_or("flat_keyvalue")
    }
}

/// Transform node settings. `field_mappings` wins over `output_template`
/// when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    pub field_mappings: Vec<FieldMapping>,
    pub output_template: Option<String>,
}

/// One source key to nested target path rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    pub source_key: String,
    /// Dot-separated path in the output, e.g. "spec.cpu".
    pub target_path: String,
}

/// Connector node settings: forward the current result to an external
/// endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectorConfig {
    /// Connector kind; only "http" is dispatched.
    #[serde(rename = "type")]
    pub connector_type: String,
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: HashMap<String, String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connector_type: "http".to_string(),
            url: None,
            method: None,
            headers: HashMap::new(),
        }
    }
}

impl ConnectorConfig {
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("POST")
    }
}

/// Splitter node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitterConfig {
    /// Cap on simultaneous extraction calls for this run; 0 means one call
    /// per file, bounded only by the shared pool.
    pub max_parallel: usize,
    /// Accepted for wire compatibility; not enforced.
    pub timeout_seconds: u64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            timeout_seconds: 60,
        }
    }
}

/// Merger node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergerConfig {
    /// "array" (default), "flat_merge", or "grouped".
    pub strategy: Option<String>,
    /// Field whose string value buckets entries under "grouped".
    pub group_by_key: Option<String>,
    /// Keep the `_fileIndex`/`_fileName` metadata on each entry.
    pub include_file_metadata: bool,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            group_by_key: None,
            include_file_metadata: true,
        }
    }
}

impl MergerConfig {
    pub fn strategy(&self) -> &str {
        self.strategy.as_deref().unwrap_or("array")
    }
}

/// Sheet-sink node settings: rows are appended through a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetSinkConfig {
    pub webhook_url: Option<String>,
    pub sheet_name: Option<String>,
    /// Ordered field keys selecting which columns each row carries; empty
    /// takes every value of the item in its own order.
    pub column_keys: Vec<String>,
    pub include_header: bool,
}

impl Default for SheetSinkConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            sheet_name: None,
            column_keys: Vec::new(),
            include_header: true,
        }
    }
}

impl SheetSinkConfig {
    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or("Sheet1")
    }
}
