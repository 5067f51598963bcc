// Model response parsing

use serde_json::Value;

use super::types::Artifact;
use crate::errors::WorkflowError;

/// Strip leading/trailing markdown code fences (```json ... ``` or ``` ... ```)
pub fn strip_markdown_fences(s: &str) -> &str {
    let s = s.trim();
    let s = if let Some(rest) = s.strip_prefix("```json") {
        rest
    } else if let Some(rest) = s.strip_prefix("```") {
        rest
    } else {
        s
    };
    if let Some(rest) = s.strip_suffix("```") {
        rest.trim()
    } else {
        s.trim()
    }
}

/// Parse a model response into a JSON object.
///
/// Fences are stripped first. If the remainder is not valid JSON, the outermost
/// `{ ... }` span is tried before giving up.
pub fn parse_json_object(text: &str) -> Result<serde_json::Map<String, Value>, String> {
    let stripped = strip_markdown_fences(text);

    let value = match serde_json::from_str::<Value>(stripped) {
        Ok(value) => value,
        Err(first_err) => {
            let embedded = stripped
                .find('{')
                .zip(stripped.rfind('}'))
                .filter(|(start, end)| start < end)
                .and_then(|(start, end)| serde_json::from_str::<Value>(&stripped[start..=end]).ok());
            match embedded {
                Some(value) => value,
                None => return Err(format!("not valid JSON: {}", first_err)),
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {}", json_type(&other))),
    }
}

/// Parse and check a candidate artifact.
///
/// Missing required fields are reported together, before serde sees the object.
pub fn parse_artifact<A: Artifact>(text: &str) -> Result<A, WorkflowError> {
    let map = parse_json_object(text).map_err(|detail| WorkflowError::malformed(A::KIND, detail))?;

    let missing: Vec<&str> = A::REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| map.get(*field).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(WorkflowError::malformed(
            A::KIND,
            format!("missing required fields: {}", missing.join(", ")),
        ));
    }

    let artifact: A = serde_json::from_value(Value::Object(map))
        .map_err(|e| WorkflowError::malformed(A::KIND, e.to_string()))?;
    artifact
        .check()
        .map_err(|detail| WorkflowError::malformed(A::KIND, detail))?;
    Ok(artifact)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
