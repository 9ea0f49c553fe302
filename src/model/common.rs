use crate::error::MetadataError;
use itertools::Itertools;
use serde_json::Value;
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Normalize a user-supplied identifier (sample name, feature name or a
/// `String` attribute value) and check it is safe to use downstream.
///
/// Runs of whitespace become a single underscore after trimming. The result
/// must be non-empty, must not start with a digit, must not start or end with
/// `-` or `.`, and may only contain `[A-Za-z0-9_.-]`.
pub fn normalize_identifier(raw: &str) -> Result<String, MetadataError> {
    let normalized = raw.split_whitespace().join("_");

    let invalid = |reason: String| MetadataError::InvalidIdentifier {
        identifier: raw.to_string(),
        reason,
    };

    let first = match normalized.chars().next() {
        Some(c) => c,
        None => return Err(invalid("identifier is empty".to_string())),
    };

    if first.is_ascii_digit() {
        return Err(invalid("cannot start with a number".to_string()));
    }
    if normalized.starts_with(['-', '.']) || normalized.ends_with(['-', '.']) {
        return Err(invalid("cannot start or end with '-' or '.'".to_string()));
    }

    let bad_chars: String = normalized
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        .unique()
        .collect();
    if !bad_chars.is_empty() {
        return Err(invalid(format!(
            "contains characters outside [A-Za-z0-9_.-]: '{}'",
            bad_chars
        )));
    }

    Ok(normalized)
}

/// Coerce one of the accepted boolean tokens.
///
/// `true`, `"true"`, `"True"` and `1` are true; `false`, `"false"`, `"False"`
/// and `0` are false. Everything else is rejected.
pub fn parse_boolean(raw: &Value) -> Result<bool, MetadataError> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "True" => Some(true),
            "false" | "False" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    };

    parsed.ok_or_else(|| {
        MetadataError::MalformedValue(format!("{} is not an accepted boolean value", raw))
    })
}

/// Name of the JSON kind of a value, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_whitespace_becomes_underscore() {
        assert_eq!(normalize_identifier("A name").unwrap(), "A_name");
        assert_eq!(normalize_identifier("  sample  one ").unwrap(), "sample_one");
        assert_eq!(normalize_identifier("gene.A-1_x").unwrap(), "gene.A-1_x");
    }

    #[test]
    fn test_identifier_rejections() {
        for bad in ["-foo", "foo-", ".foo", "foo.", "1abc", "", "   ", "a#b", "a/b", "ä"] {
            let err = normalize_identifier(bad).unwrap_err();
            assert!(
                matches!(err, MetadataError::InvalidIdentifier { .. }),
                "expected '{}' to be rejected, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_boolean_tokens() {
        for token in [json!(true), json!("true"), json!("True"), json!(1)] {
            assert!(parse_boolean(&token).unwrap());
        }
        for token in [json!(false), json!("false"), json!("False"), json!(0)] {
            assert!(!parse_boolean(&token).unwrap());
        }
        for token in [json!(2), json!(-1), json!(1.0), json!("TRUE"), json!("yes"), json!(null)] {
            assert!(parse_boolean(&token).is_err(), "{} should be rejected", token);
        }
    }

    #[test]
    fn test_json_kind_distinguishes_numbers() {
        assert_eq!(json_kind(&json!(3)), "integer");
        assert_eq!(json_kind(&json!(3.0)), "float");
        assert_eq!(json_kind(&json!([1])), "array");
    }
}
