use serde_json::Value;

/// Validate `instance` against a JSON schema, returning every violation
///
/// An invalid schema is reported as a single violation rather than panicking.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| vec![format!("invalid JSON schema: {e}")])?;
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_instance() {
        let schema = json!({"type": "object", "required": ["tempC"]});
        assert!(validate(&schema, &json!({"tempC": 20})).is_ok());
    }

    #[test]
    fn test_collects_errors_with_paths() {
        let schema = json!({
            "type": "object",
            "properties": {"tempC": {"type": "number"}},
            "required": ["tempC", "city"]
        });
        let errors = validate(&schema, &json!({"tempC": "warm"})).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("/tempC")));
    }

    #[test]
    fn test_null_fails_object_schema() {
        assert!(validate(&json!({"type": "object"}), &Value::Null).is_err());
    }

    #[test]
    fn test_invalid_schema_is_reported() {
        let errors = validate(&json!({"type": 12}), &json!({})).unwrap_err();
        assert!(errors[0].starts_with("invalid JSON schema"));
    }
}
