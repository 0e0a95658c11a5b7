//! Typed access to the untyped argument bag of a tool call.

use serde_json::{Map, Value};

use super::result::ToolError;

/// Arguments of a tool call.
///
/// `null` values are treated as absent. Accessors fail with
/// [`ToolError::Validation`] instead of coercing mismatched types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    /// Wrap a raw argument value; `null` counts as no arguments
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::invalid(format!(
                "arguments must be a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// A string argument that must be present and non-blank
    pub fn required_str(&self, key: &str) -> Result<&str, ToolError> {
        self.optional_str(key)?
            .ok_or_else(|| ToolError::invalid(format!("missing required argument '{}'", key)))
    }

    /// A string argument that may be absent; blank strings count as absent
    pub fn optional_str(&self, key: &str) -> Result<Option<&str>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(key, "a string", other)),
        }
    }

    /// A positive integer argument, `default` when absent.
    ///
    /// Accepts JSON numbers with an integral value (`5` or `5.0`).
    pub fn positive_int_or(&self, key: &str, default: u32) -> Result<u32, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };

        let number = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            _ => None,
        };

        match number.and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n > 0 => Ok(n),
            _ => Err(mismatch(key, "a positive integer", value)),
        }
    }

    /// A boolean argument that must be present.
    ///
    /// Accepts JSON booleans and the strings `"true"` / `"false"`.
    pub fn required_bool(&self, key: &str) -> Result<bool, ToolError> {
        match self.get(key) {
            None => Err(ToolError::invalid(format!(
                "missing required argument '{}'",
                key
            ))),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(mismatch(key, "a boolean", other)),
        }
    }
}

fn mismatch(key: &str, expected: &str, got: &Value) -> ToolError {
    ToolError::invalid(format!(
        "argument '{}' must be {}, got {}",
        key,
        expected,
        type_name(got)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::from_value(value).unwrap()
    }

    #[test]
    fn test_null_is_empty() {
        assert_eq!(ToolArgs::from_value(Value::Null).unwrap(), ToolArgs::default());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = ToolArgs::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments: arguments must be a JSON object, got array"
        );
    }

    #[test]
    fn test_required_str() {
        let a = args(json!({"question": "what", "blank": "  ", "num": 3}));
        assert_eq!(a.required_str("question").unwrap(), "what");
        assert!(a.required_str("blank").is_err());
        assert!(a.required_str("missing").is_err());
        assert!(matches!(a.required_str("num"), Err(ToolError::Validation(_))));
    }

    #[test]
    fn test_optional_str_null_is_absent() {
        let a = args(json!({"pipelineId": null}));
        assert_eq!(a.optional_str("pipelineId").unwrap(), None);
    }

    #[test]
    fn test_positive_int_default_and_values() {
        let a = args(json!({"a": 5, "b": 7.0, "c": 2.5, "d": 0, "e": "5", "f": -1}));
        assert_eq!(a.positive_int_or("missing", 4).unwrap(), 4);
        assert_eq!(a.positive_int_or("a", 4).unwrap(), 5);
        assert_eq!(a.positive_int_or("b", 4).unwrap(), 7);
        assert!(a.positive_int_or("c", 4).is_err());
        assert!(a.positive_int_or("d", 4).is_err());
        assert!(a.positive_int_or("e", 4).is_err());
        assert!(a.positive_int_or("f", 4).is_err());
    }

    #[test]
    fn test_required_bool() {
        let a = args(json!({"t": true, "f": false, "st": "TRUE", "sf": "false", "n": 1}));
        assert!(a.required_bool("t").unwrap());
        assert!(!a.required_bool("f").unwrap());
        assert!(a.required_bool("st").unwrap());
        assert!(!a.required_bool("sf").unwrap());
        assert!(a.required_bool("n").is_err());
        assert!(a.required_bool("missing").is_err());
    }

    #[test]
    fn test_string_false_is_not_truthy() {
        let a = args(json!({"webSearch": "false"}));
        assert!(!a.required_bool("webSearch").unwrap());
    }
}
