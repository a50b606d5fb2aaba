//! # App List Discovery
//!
//! Reads the list of managed apps out of a raw config document.
//!
//! The config server may render the app list field either as an array or, when
//! only one app is listed, as a plain string. Both are accepted; any other
//! shape is a [`ReconcileError::Shape`].

use crate::controller::error::ReconcileError;
use serde_json::Value;

/// Extract the app names stored under `field` in the JSON document `raw`
///
/// `field` is looked up as a top-level key first, then as a dotted path into
/// nested objects (`deploy.services`).
pub fn parse_app_list(raw: &[u8], field: &str, app: &str) -> Result<Vec<String>, ReconcileError> {
    let document: Value = serde_json::from_slice(raw).map_err(|e| ReconcileError::Shape {
        field: field.to_string(),
        detail: format!("could not be read, the '{app}' configuration is not valid JSON: {e}"),
    })?;

    let value = lookup(&document, field).ok_or_else(|| ReconcileError::Shape {
        field: field.to_string(),
        detail: format!("does not exist in the '{app}' configuration"),
    })?;

    match value {
        Value::String(name) => Ok(vec![name.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(ReconcileError::Shape {
                    field: field.to_string(),
                    detail: format!(
                        "should be an array of strings, found an array containing {}",
                        shape_name(other)
                    ),
                }),
            })
            .collect(),
        other => Err(ReconcileError::Shape {
            field: field.to_string(),
            detail: format!("should be an array of strings, found {}", shape_name(other)),
        }),
    }
}

fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(field) {
        return Some(value);
    }
    field
        .split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::error::FailureKind;

    #[test]
    fn test_list_value() {
        let apps = parse_app_list(br#"{"services": ["article", "authz"]}"#, "services", "shop").unwrap();
        assert_eq!(apps, vec!["article", "authz"]);
    }

    #[test]
    fn test_scalar_value() {
        let apps = parse_app_list(br#"{"services": "myapp"}"#, "services", "shop").unwrap();
        assert_eq!(apps, vec!["myapp"]);
    }

    #[test]
    fn test_nested_object_is_shape_error() {
        let error =
            parse_app_list(br#"{"services": {"nested": "value"}}"#, "services", "shop").unwrap_err();
        assert_eq!(error.kind(), FailureKind::Shape);
        assert_eq!(
            error.to_string(),
            "app list field 'services' should be an array of strings, found an object"
        );
    }

    #[test]
    fn test_number_is_shape_error() {
        let error = parse_app_list(br#"{"services": 3}"#, "services", "shop").unwrap_err();
        assert!(error.to_string().contains("found a number"));
    }

    #[test]
    fn test_absent_field_is_shape_error() {
        let error = parse_app_list(br#"{"other": []}"#, "services", "shop").unwrap_err();
        assert_eq!(error.kind(), FailureKind::Shape);
        assert_eq!(
            error.to_string(),
            "app list field 'services' does not exist in the 'shop' configuration"
        );
    }

    #[test]
    fn test_array_of_objects_is_shape_error() {
        let error = parse_app_list(br#"{"services": [{"a": 1}]}"#, "services", "shop").unwrap_err();
        assert!(error.to_string().contains("array containing an object"));
    }

    #[test]
    fn test_dotted_path() {
        let apps =
            parse_app_list(br#"{"deploy": {"services": ["a"]}}"#, "deploy.services", "shop").unwrap();
        assert_eq!(apps, vec!["a"]);
    }

    #[test]
    fn test_invalid_json_is_shape_error() {
        let error = parse_app_list(b"services: [a]", "services", "shop").unwrap_err();
        assert_eq!(error.kind(), FailureKind::Shape);
    }

    #[test]
    fn test_empty_list_is_allowed() {
        let apps = parse_app_list(br#"{"services": []}"#, "services", "shop").unwrap();
        assert!(apps.is_empty());
    }
}
