use doccore::{EngineError, ExtractConfig, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Filter and shape a raw extraction-service response.
///
/// A document without a top-level `fields` array is returned unmodified —
/// non-standard responses pass through whole. Otherwise fields are filtered
/// by confidence threshold and key allow-list, then shaped according to the
/// configured output format.
pub fn parse_response(body: &str, config: &ExtractConfig) -> Result<Value> {
    let document: Value = serde_json::from_str(body).map_err(|e| {
        EngineError::ExternalCall(format!("unparseable extraction response: {}", e))
    })?;

    let Some(fields) = document.get("fields").and_then(Value::as_array) else {
        return Ok(document);
    };

    let filtered: Vec<Map<String, Value>> = fields
        .iter()
        .filter_map(Value::as_object)
        .filter(|f| passes_confidence(f, config.min_confidence))
        .filter(|f| passes_selection(f, &config.selected_keys))
        .cloned()
        .collect();

    match config.output_format() {
        "full" => Ok(document),
        "flat_keyvalue" => Ok(flat_keyvalue(&filtered, &config.key_mappings)),
        _ => {
            let mut shaped = Map::new();
            shaped.insert(
                "fields".to_string(),
                remap_fields(filtered, &config.key_mappings),
            );
            Ok(Value::Object(shaped))
        }
    }
}

/// Entries with no confidence value, or with no threshold configured, always
/// pass.
fn passes_confidence(field: &Map<String, Value>, min_confidence: Option<f64>) -> bool {
    match (min_confidence, field.get("confidence").and_then(Value::as_f64)) {
        (Some(min), Some(confidence)) => confidence >= min,
        _ => true,
    }
}

fn passes_selection(field: &Map<String, Value>, selected_keys: &[String]) -> bool {
    if selected_keys.is_empty() {
        return true;
    }
    field
        .get("key")
        .and_then(Value::as_str)
        .map(|key| selected_keys.iter().any(|k| k == key))
        .unwrap_or(false)
}

fn remap<'a>(key: &'a str, mappings: &'a HashMap<String, String>) -> &'a str {
    mappings.get(key).map(String::as_str).unwrap_or(key)
}

/// Extracted value of a field entry, preferring the refined value.
fn field_value(field: &Map<String, Value>) -> Value {
    field
        .get("refinedValue")
        .filter(|v| !v.is_null())
        .or_else(|| field.get("value"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn flat_keyvalue(fields: &[Map<String, Value>], mappings: &HashMap<String, String>) -> Value {
    let mut out = Map::new();
    for field in fields {
        let Some(key) = field.get("key").and_then(Value::as_str) else {
            continue;
        };
        out.insert(remap(key, mappings).to_string(), field_value(field));
    }
    Value::Object(out)
}

fn remap_fields(fields: Vec<Map<String, Value>>, mappings: &HashMap<String, String>) -> Value {
    let entries = fields
        .into_iter()
        .map(|mut field| {
            if let Some(mapped) = field
                .get("key")
                .and_then(Value::as_str)
                .and_then(|key| mappings.get(key))
            {
                field.insert("key".to_string(), Value::String(mapped.clone()));
            }
            Value::Object(field)
        })
        .collect();
    Value::Array(entries)
}
