//! Declared type to Postgres type mapping.

/// Auto-increment replacement for an integer-family type, if there is one.
pub fn serial_type(declared: &str) -> Option<&'static str> {
    match base_type(declared).as_str() {
        "int" | "int4" | "integer" | "serial" => Some("SERIAL"),
        "bigint" | "int8" | "bigserial" => Some("BIGSERIAL"),
        "smallint" | "int2" | "smallserial" => Some("SMALLSERIAL"),
        _ => None,
    }
}

/// Normalize aliases Postgres does not accept as written. Everything else
/// keeps its declared spelling, arguments included.
pub fn map_type(declared: &str) -> String {
    let declared = declared.trim();
    match base_type(declared).as_str() {
        "timestamptz" => "TIMESTAMP WITH TIME ZONE".to_string(),
        "datetime" => "TIMESTAMP".to_string(),
        "bool" => "BOOLEAN".to_string(),
        // Arrays of aliased types
        t if t.ends_with("[]") && declared.len() > 2 => {
            let inner = &declared[..declared.len() - 2];
            format!("{}[]", map_type(inner))
        }
        _ => declared.to_string(),
    }
}

/// Final type clause for a column. `is_enum` tells whether the declared
/// type names an enum of the same model.
pub fn column_type(declared: &str, increment: bool, is_enum: bool) -> String {
    if increment {
        if let Some(serial) = serial_type(declared) {
            return serial.to_string();
        }
    }
    if is_enum {
        return super::quote_ident(declared);
    }
    map_type(declared)
}

fn base_type(declared: &str) -> String {
    let lower = declared.trim().to_lowercase();
    lower.split('(').next().unwrap_or(&lower).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_types() {
        assert_eq!(serial_type("integer"), Some("SERIAL"));
        assert_eq!(serial_type("INT"), Some("SERIAL"));
        assert_eq!(serial_type("bigint"), Some("BIGSERIAL"));
        assert_eq!(serial_type("int2"), Some("SMALLSERIAL"));
        assert_eq!(serial_type("varchar"), None);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(map_type("timestamptz"), "TIMESTAMP WITH TIME ZONE");
        assert_eq!(map_type("DateTime"), "TIMESTAMP");
        assert_eq!(map_type("bool"), "BOOLEAN");
        assert_eq!(map_type("datetime[]"), "TIMESTAMP[]");
    }

    #[test]
    fn test_passthrough_keeps_spelling() {
        assert_eq!(map_type("varchar(255)"), "varchar(255)");
        assert_eq!(map_type("decimal(10, 2)"), "decimal(10, 2)");
        assert_eq!(map_type("jsonb"), "jsonb");
    }

    #[test]
    fn test_column_type() {
        assert_eq!(column_type("integer", true, false), "SERIAL");
        assert_eq!(column_type("integer", false, false), "integer");
        // increment on a non-integer type has nothing to substitute
        assert_eq!(column_type("uuid", true, false), "uuid");
        assert_eq!(column_type("status_enum", false, true), "\"status_enum\"");
    }
}
