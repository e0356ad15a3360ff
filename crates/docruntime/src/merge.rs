use doccore::MergerConfig;
use serde_json::{json, Map, Value};

/// Combine a fan-out result sequence into a single value.
///
/// Anything that is not an array passes through unchanged; non-object
/// entries are dropped. Strategies: `array` (default) wraps the entries
/// with a count, `flat_merge` shallow-merges them (later entries win),
/// `grouped` buckets them by the string value of the configured key.
pub fn merge(input: Value, config: &MergerConfig) -> Value {
    let Value::Array(items) = input else {
        return input;
    };

    let mut entries: Vec<Map<String, Value>> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if !config.include_file_metadata {
        for entry in &mut entries {
            entry.remove("_fileIndex");
            entry.remove("_fileName");
        }
    }

    match config.strategy() {
        "flat_merge" => {
            let mut merged = Map::new();
            for entry in entries {
                merged.extend(entry);
            }
            Value::Object(merged)
        }
        "grouped" => match config.group_by_key.as_deref() {
            Some(group_key) => grouped(entries, group_key),
            // no grouping key to bucket on: hand the sequence back as-is
            None => Value::Array(entries.into_iter().map(Value::Object).collect()),
        },
        _ => json!({
            "totalFiles": entries.len(),
            "items": entries,
        }),
    }
}

fn grouped(entries: Vec<Map<String, Value>>, group_key: &str) -> Value {
    let mut groups: Map<String, Value> = Map::new();
    for entry in entries {
        let bucket = entry
            .get(group_key)
            .map(bucket_key)
            .unwrap_or_else(|| "unknown".to_string());
        let slot = groups
            .entry(bucket)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(members) = slot {
            members.push(Value::Object(entry));
        }
    }
    Value::Object(groups)
}

fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
