//! Static JSON dataset: table name to an ordered array of flat records.

use crate::error::DatasetError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field carrying the relation marker.
pub const MARKER_FIELD: &str = "REL";
const MARKER_ALIAS: &str = "relation";
/// Legacy hint left by the export scripts; never a column.
const HINT_FIELD: &str = "REF";

/// Natural keys pointing at parent records, e.g. `{ "email": "a@b.c" }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationMarker(Map<String, Value>);

impl RelationMarker {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// A non-empty string under `field`. Numbers and nulls do not count.
    pub fn get(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub marker: Option<RelationMarker>,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn from_object(mut fields: Map<String, Value>) -> Self {
        let marker = fields
            .remove(MARKER_FIELD)
            .or_else(|| fields.remove(MARKER_ALIAS));
        fields.remove(HINT_FIELD);

        let marker = match marker {
            Some(Value::Object(m)) => Some(RelationMarker::new(m)),
            _ => None,
        };
        Self { marker, fields }
    }

    pub fn marker_key(&self, field: &str) -> Option<&str> {
        self.marker.as_ref().and_then(|m| m.get(field))
    }

    /// A string column value, for registering natural keys.
    pub fn field_str(&self, column: &str) -> Option<&str> {
        match self.fields.get(column) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: BTreeMap<String, Vec<RawRecord>>,
}

impl Dataset {
    pub fn from_json(text: &str) -> Result<Self, DatasetError> {
        let root: Value = serde_json::from_str(text)?;
        let Value::Object(entries) = root else {
            return Err(DatasetError::RootNotAnObject);
        };

        let mut tables = BTreeMap::new();
        for (table, value) in entries {
            let items = match value {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                _ => return Err(DatasetError::NotAnArray(table)),
            };

            let mut records = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(fields) => records.push(RawRecord::from_object(fields)),
                    _ => return Err(DatasetError::NotAnObject { table, index }),
                }
            }
            tables.insert(table, records);
        }

        Ok(Self { tables })
    }

    pub fn records(&self, table: &str) -> &[RawRecord] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATASET: &str = r#"{
        "users": [
            { "email": "a@example.com", "is_admin": true }
        ],
        "user_profiles": [
            { "REL": { "email": "a@example.com" }, "REF": { "venues.name": "x" }, "handle": "a" },
            { "relation": { "key": "Homerton Library" }, "handle": "b" }
        ],
        "exchange_rates": null
    }"#;

    #[test]
    fn test_parse_dataset() {
        let dataset = Dataset::from_json(DATASET).unwrap();
        assert_eq!(
            dataset.table_names().collect::<Vec<_>>(),
            vec!["exchange_rates", "user_profiles", "users"]
        );
        assert!(dataset.records("exchange_rates").is_empty());
        assert!(dataset.records("missing").is_empty());

        let users = dataset.records("users");
        assert_eq!(users.len(), 1);
        assert!(users[0].marker.is_none());
        assert_eq!(users[0].field_str("email"), Some("a@example.com"));
    }

    #[test]
    fn test_marker_is_split_from_fields() {
        let dataset = Dataset::from_json(DATASET).unwrap();
        let profiles = dataset.records("user_profiles");

        assert_eq!(profiles[0].marker_key("email"), Some("a@example.com"));
        assert_eq!(profiles[0].fields.len(), 1);
        assert_eq!(profiles[0].fields.get("handle"), Some(&json!("a")));

        assert_eq!(profiles[1].marker_key("key"), Some("Homerton Library"));
        assert_eq!(profiles[1].marker_key("email"), None);
    }

    #[test]
    fn test_marker_ignores_non_strings() {
        let record = RawRecord::from_object(
            json!({ "REL": { "email": null, "n": 3, "key": "  " } })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(record.marker_key("email"), None);
        assert_eq!(record.marker_key("n"), None);
        assert_eq!(record.marker_key("key"), None);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let root = Dataset::from_json("[]").unwrap_err();
        assert!(matches!(root, DatasetError::RootNotAnObject));
        assert_eq!(root.to_string(), "dataset must be a JSON object keyed by table name");
        assert!(matches!(
            Dataset::from_json(r#"{ "users": { "email": "x" } }"#),
            Err(DatasetError::NotAnArray(t)) if t == "users"
        ));
        assert!(matches!(
            Dataset::from_json(r#"{ "users": [ {}, 3 ] }"#),
            Err(DatasetError::NotAnObject { index: 1, .. })
        ));
        assert!(matches!(Dataset::from_json("{"), Err(DatasetError::Json(_))));
    }
}
