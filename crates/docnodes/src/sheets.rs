use doccore::SheetSinkConfig;
use serde_json::{json, Map, Value};

/// Build the webhook payload for a spreadsheet append: an optional header
/// row followed by one row per entry of an `items` result. Data in any other
/// shape produces an empty row set.
pub fn sheet_payload(config: &SheetSinkConfig, data: &Value) -> Value {
    let mut rows: Vec<Vec<Value>> = Vec::new();
    if let Some(items) = data.get("items").and_then(Value::as_array) {
        if config.include_header && !config.column_keys.is_empty() {
            rows.push(
                config
                    .column_keys
                    .iter()
                    .map(|key| Value::String(key.clone()))
                    .collect(),
            );
        }
        for item in items.iter().filter_map(Value::as_object) {
            rows.push(row_for(item, &config.column_keys));
        }
    }
    json!({
        "sheetName": config.sheet_name(),
        "rows": rows,
    })
}

fn row_for(item: &Map<String, Value>, column_keys: &[String]) -> Vec<Value> {
    if column_keys.is_empty() {
        return item.values().cloned().collect();
    }
    column_keys
        .iter()
        .map(|key| {
            item.get(key)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()))
        })
        .collect()
}
