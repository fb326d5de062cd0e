//! JSON Schema validation of run input and output.

use serde_json::Value;

/// Validate `data` against a JSON Schema document.
///
/// A `null` schema (the field was omitted) constrains nothing. All
/// violations of one validation are aggregated into a single diagnostic.
pub fn validate(schema: &Value, data: &Value) -> Result<(), String> {
    if schema.is_null() {
        return Ok(());
    }

    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid schema: {e}"))?;

    let messages: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(messages.join("; "))
    }
}
