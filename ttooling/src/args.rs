//! JSON argument parsing helpers for function and trait-based tools.
//!
//! ```rust
//! use ttooling::{parse_json_object, required_string};
//!
//! let args = parse_json_object(r#"{"city":"Lisbon"}"#).expect("object should parse");
//! let city = required_string(&args, "city").expect("city should be present");
//! assert_eq!(city, "Lisbon");
//! ```

use serde_json::{Map, Value};

use crate::ToolError;

pub fn parse_json_object(args_json: &str) -> Result<Map<String, Value>, ToolError> {
    // Providers send an empty string for tools that take no input.
    if args_json.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(ToString::to_string)
}

pub fn required_f64(args: &Map<String, Value>, key: &str) -> Result<f64, ToolError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required number: '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolErrorKind;

    #[test]
    fn empty_arguments_parse_as_empty_object() {
        let args = parse_json_object("  ").expect("blank args should parse");
        assert!(args.is_empty());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let error = parse_json_object("[1,2]").expect_err("array should be rejected");
        assert_eq!(error.kind, ToolErrorKind::InvalidArguments);
    }

    #[test]
    fn typed_extractors_report_missing_keys() {
        let args = parse_json_object(r#"{"amount":12.5,"note":"lunch"}"#).expect("args parse");
        assert_eq!(required_f64(&args, "amount"), Ok(12.5));
        assert_eq!(optional_string(&args, "note").as_deref(), Some("lunch"));
        assert_eq!(optional_string(&args, "tag"), None);

        let error = required_string(&args, "currency").expect_err("currency is missing");
        assert_eq!(error.kind, ToolErrorKind::InvalidArguments);
    }
}
