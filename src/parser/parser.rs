use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Extract a single string value from a response body.
///
/// An empty `pointer` selects the whole body as plain text. Otherwise the body
/// must be JSON and `pointer` is an RFC 6901 JSON pointer (`/data/jwt`).
/// Returns `Ok(None)` when the value is absent, null or empty.
pub fn extract_value(body: &str, pointer: &str) -> Result<Option<String>> {
    if pointer.is_empty() {
        let raw = body.trim();
        return Ok(match raw {
            "" | "null" => None,
            value => Some(value.to_owned()),
        });
    }

    let json: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Body is not valid JSON: {}", e);
        anyhow!("body is not valid JSON: {}", e)
    })?;

    match json.pointer(pointer) {
        None | Some(Value::Null) => {
            debug!(pointer = %pointer, "value absent");
            Ok(None)
        }
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.trim().to_owned())),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(anyhow!(
            "value at '{}' must be a string, got {}",
            pointer,
            json_type(other)
        )),
    }
}

/// Parse a successful response body. Empty bodies become `Value::Null`.
pub fn parse_json_body(body: &str) -> serde_json::Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
