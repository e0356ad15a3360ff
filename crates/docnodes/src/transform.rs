use doccore::{EngineError, FieldMapping, Result, TransformConfig};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reshape a result into a caller-defined structure.
///
/// `field_mappings` takes priority over `output_template`; with neither
/// configured the input passes through unchanged.
pub fn transform(input: Value, config: &TransformConfig) -> Result<Value> {
    if !config.field_mappings.is_empty() {
        return transform_by_mappings(input, &config.field_mappings);
    }
    if let Some(template) = config
        .output_template
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        return transform_by_template(input, template);
    }
    Ok(input)
}

/// The transformer operates on object-shaped input; a string input is given
/// one chance to parse as a JSON object.
fn as_object(input: Value) -> Result<Map<String, Value>> {
    match input {
        Value::Object(map) => Ok(map),
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(EngineError::Precondition(
                "transform input is not an object".into(),
            )),
        },
        _ => Err(EngineError::Precondition(
            "transform input is not an object".into(),
        )),
    }
}

fn transform_by_mappings(input: Value, mappings: &[FieldMapping]) -> Result<Value> {
    let data = as_object(input)?;
    let mut result = Map::new();
    for mapping in mappings {
        if mapping.source_key.is_empty() || mapping.target_path.is_empty() {
            continue;
        }
        let value = lookup(&data, &mapping.source_key);
        set_nested(&mut result, &mapping.target_path, value);
    }
    Ok(Value::Object(result))
}

/// Direct key lookup, falling back to a `fields` array of
/// {key, value, refinedValue} entries. Absent everywhere means null.
fn lookup(data: &Map<String, Value>, source_key: &str) -> Value {
    if let Some(value) = data.get(source_key) {
        if !value.is_null() {
            return value.clone();
        }
    }
    if let Some(fields) = data.get("fields").and_then(Value::as_array) {
        for field in fields.iter().filter_map(Value::as_object) {
            if field.get("key").and_then(Value::as_str) == Some(source_key) {
                return field
                    .get("refinedValue")
                    .filter(|v| !v.is_null())
                    .or_else(|| field.get("value"))
                    .cloned()
                    .unwrap_or(Value::Null);
            }
        }
    }
    Value::Null
}

/// Assign at a dot-separated path, creating intermediate objects as needed.
/// A non-object value sitting on an intermediate segment is replaced.
fn set_nested(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            unreachable!()
        };
        current = next;
    }
    current.insert(segments[segments.len() - 1].to_string(), value);
}

fn transform_by_template(input: Value, template: &str) -> Result<Value> {
    let data = as_object(input)?;
    let flat = flatten(&data);
    let substituted = substitute(template, &flat);
    serde_json::from_str(&substituted).map_err(|e| {
        EngineError::Config(format!("output template produced invalid JSON: {}", e))
    })
}

/// Flat string view of the input: top-level entries first, then `fields`
/// entries overlaid on top (these win on key collision).
fn flatten(data: &Map<String, Value>) -> HashMap<String, String> {
    let mut flat: HashMap<String, String> = data
        .iter()
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect();
    if let Some(fields) = data.get("fields").and_then(Value::as_array) {
        for field in fields.iter().filter_map(Value::as_object) {
            if let Some(key) = field.get("key").and_then(Value::as_str) {
                let value = field
                    .get("refinedValue")
                    .filter(|v| !v.is_null())
                    .or_else(|| field.get("value"))
                    .cloned()
                    .unwrap_or(Value::Null);
                flat.insert(key.to_string(), stringify(&value));
            }
        }
    }
    flat
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace every `{{key}}` placeholder. Missing keys substitute as empty;
/// replacements are escaped so they stay safe inside a JSON string literal.
fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                let replacement = values.get(key).map(String::as_str).unwrap_or("");
                out.push_str(&replacement.replace('\\', "\\\\").replace('"', "\\\""));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
