use doccore::{NodeKind, Workflow};

fn sample_graph() -> Workflow {
    let raw = r#"{
        "id": "wf-invoices",
        "name": "Invoice pipeline",
        "nodes": [
            {"id": "in", "label": "Upload", "positionX": 0, "positionY": 0, "type": "input"},
            {"id": "split", "type": "splitter", "config": {"maxParallel": 3}},
            {"id": "extract", "type": "uie", "config": {
                "url": "https://extract.example.com/v1",
                "selectedKeys": ["invoice_no", "total"],
                "outputFormat": "flat_keyvalue",
                "keyMappings": {"invoice_no": "invoiceNumber"},
                "minConfidence": 0.5
            }},
            {"id": "join", "type": "merger", "config": {
                "strategy": "grouped",
                "groupByKey": "vendor",
                "includeFileMetadata": false
            }},
            {"id": "shape", "type": "transform", "config": {
                "fieldMappings": [{"sourceKey": "total", "targetPath": "invoice.total"}]
            }},
            {"id": "notify", "type": "connector", "config": {"url": "https://hooks.example.com"}},
            {"id": "sheet", "type": "googlesheets", "config": {"webhookUrl": "https://sheets.example.com"}},
            {"id": "out", "type": "output"}
        ],
        "edges": [
            {"id": "e1", "sourceNodeId": "in", "targetNodeId": "split"},
            {"id": "e2", "sourceNodeId": "split", "targetNodeId": "extract"},
            {"id": "e3", "sourceNodeId": "extract", "targetNodeId": "join"},
            {"id": "e4", "sourceNodeId": "join", "targetNodeId": "shape"},
            {"id": "e5", "sourceNodeId": "shape", "targetNodeId": "notify"},
            {"id": "e6", "sourceNodeId": "notify", "targetNodeId": "sheet"},
            {"id": "e7", "sourceNodeId": "sheet", "targetNodeId": "out"}
        ]
    }"#;
    serde_json::from_str(raw).expect("graph should deserialize")
}

#[test]
fn deserializes_every_node_kind() {
    let workflow = sample_graph();
    assert_eq!(workflow.id, "wf-invoices");
    assert_eq!(workflow.nodes.len(), 8);
    assert_eq!(workflow.edges.len(), 7);

    let kinds: Vec<&str> = workflow.nodes.iter().map(|n| n.kind.name()).collect();
    assert_eq!(
        kinds,
        vec![
            "input",
            "splitter",
            "uie",
            "merger",
            "transform",
            "connector",
            "googlesheets",
            "output"
        ]
    );
}

#[test]
fn extract_config_carries_parsing_settings() {
    let workflow = sample_graph();
    let NodeKind::Uie { config } = &workflow.find_node("extract").unwrap().kind else {
        panic!("expected extract node");
    };
    assert_eq!(config.url.as_deref(), Some("https://extract.example.com/v1"));
    assert_eq!(config.selected_keys, vec!["invoice_no", "total"]);
    assert_eq!(
        config.key_mappings.get("invoice_no").map(String::as_str),
        Some("invoiceNumber")
    );
    assert_eq!(config.min_confidence, Some(0.5));
    // unset values fall back to their defaults
    assert_eq!(config.method(), "POST");
    assert_eq!(config.file_field_name(), "file");
}

#[test]
fn missing_config_defaults() {
    let raw = r#"{
        "id": "wf", "name": "bare",
        "nodes": [
            {"id": "s", "type": "splitter"},
            {"id": "m", "type": "merger"},
            {"id": "g", "type": "googlesheets"}
        ],
        "edges": []
    }"#;
    let workflow: Workflow = serde_json::from_str(raw).unwrap();

    let NodeKind::Splitter { config } = &workflow.find_node("s").unwrap().kind else {
        panic!("expected splitter");
    };
    assert_eq!(config.max_parallel, 0);
    assert_eq!(config.timeout_seconds, 60);

    let NodeKind::Merger { config } = &workflow.find_node("m").unwrap().kind else {
        panic!("expected merger");
    };
    assert_eq!(config.strategy(), "array");
    assert!(config.include_file_metadata);

    let NodeKind::Sheets { config } = &workflow.find_node("g").unwrap().kind else {
        panic!("expected sheet sink");
    };
    assert_eq!(config.sheet_name(), "Sheet1");
    assert!(config.include_header);
}

#[test]
fn traversal_helpers() {
    let workflow = sample_graph();
    assert_eq!(workflow.input_node_id(), Some("in"));
    assert_eq!(workflow.next_node_id("in"), Some("split"));
    assert_eq!(workflow.next_node_id("out"), None);
    assert!(workflow.find_node("nope").is_none());
}

#[test]
fn first_edge_wins_with_multiple_outgoing() {
    let raw = r#"{
        "id": "wf", "name": "forked",
        "nodes": [
            {"id": "a", "type": "input"},
            {"id": "b", "type": "output"},
            {"id": "c", "type": "output"}
        ],
        "edges": [
            {"id": "e1", "sourceNodeId": "a", "targetNodeId": "b"},
            {"id": "e2", "sourceNodeId": "a", "targetNodeId": "c"}
        ]
    }"#;
    let workflow: Workflow = serde_json::from_str(raw).unwrap();
    assert_eq!(workflow.next_node_id("a"), Some("b"));
}

#[test]
fn kind_tag_round_trips() {
    let workflow = sample_graph();
    let serialized = serde_json::to_value(&workflow).unwrap();
    let sheet = serialized["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "sheet")
        .unwrap();
    assert_eq!(sheet["type"], "googlesheets");
}
