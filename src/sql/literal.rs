//! Identifier and literal quoting.

use crate::ast::DefaultValue;
use serde_json::Value;

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn is_numeric(s: &str) -> bool {
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int, frac) = match mantissa.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (mantissa, ""),
    };
    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());

    if int.is_empty() && frac.is_empty() {
        return false;
    }
    if !digits(int) || !digits(frac) {
        return false;
    }
    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && digits(e)
        }
    }
}

/// `DEFAULT` clause value for a column. Quoted values stay strings, apart
/// from `now()`; only bare values become booleans or numbers.
pub fn render_default(default: &DefaultValue) -> String {
    if default.raw.trim().eq_ignore_ascii_case("now()") {
        return "CURRENT_TIMESTAMP".to_string();
    }
    if default.quoted {
        return quote_str(&default.raw);
    }

    let raw = default.raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "true" => "TRUE".to_string(),
        "false" => "FALSE".to_string(),
        _ if is_numeric(raw) => raw.to_string(),
        _ => quote_str(raw),
    }
}

/// Inline SQL literal for a dataset value. Arrays and objects are stored as
/// their JSON text and left to the column type to coerce.
pub fn json_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_str(s),
        Value::Array(_) | Value::Object(_) => quote_str(&value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default(raw: &str) -> DefaultValue {
        DefaultValue {
            raw: raw.to_string(),
            quoted: false,
        }
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
        assert_eq!(quote_str("O'Neil"), "'O''Neil'");
    }

    #[test]
    fn test_render_default() {
        assert_eq!(render_default(&default("now()")), "CURRENT_TIMESTAMP");
        assert_eq!(render_default(&default("NOW()")), "CURRENT_TIMESTAMP");
        assert_eq!(render_default(&default("true")), "TRUE");
        assert_eq!(render_default(&default("False")), "FALSE");
        assert_eq!(render_default(&default("0")), "0");
        assert_eq!(render_default(&default("-2.5")), "-2.5");
        assert_eq!(render_default(&default("1e3")), "1e3");
        assert_eq!(render_default(&default("europe/london")), "'europe/london'");
        assert_eq!(render_default(&default("it's")), "'it''s'");
        assert_eq!(render_default(&default("[]")), "'[]'");
        assert_eq!(render_default(&default("  london ")), "'london'");
    }

    #[test]
    fn test_quoted_defaults_stay_strings() {
        let quoted = |raw: &str| DefaultValue {
            raw: raw.to_string(),
            quoted: true,
        };
        assert_eq!(render_default(&quoted("007")), "'007'");
        assert_eq!(render_default(&quoted("1e3")), "'1e3'");
        assert_eq!(render_default(&quoted("true")), "'true'");
        assert_eq!(render_default(&quoted(" padded ")), "' padded '");
        assert_eq!(render_default(&quoted("now()")), "CURRENT_TIMESTAMP");

        assert_eq!(render_default(&default("007")), "007");
        assert_eq!(render_default(&default("1e3")), "1e3");
        assert_eq!(render_default(&default("true")), "TRUE");
    }

    #[test]
    fn test_not_numeric() {
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("."));
        assert!(!is_numeric("1e"));
        assert!(!is_numeric("12a"));
        assert!(is_numeric(".5"));
    }

    #[test]
    fn test_json_literal() {
        assert_eq!(json_literal(&json!(null)), "NULL");
        assert_eq!(json_literal(&json!(true)), "TRUE");
        assert_eq!(json_literal(&json!(7)), "7");
        assert_eq!(json_literal(&json!("a'b")), "'a''b'");
        assert_eq!(
            json_literal(&json!(["General Admission", 10])),
            "'[\"General Admission\",10]'"
        );
    }
}
