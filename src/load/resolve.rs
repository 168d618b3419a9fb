//! Natural-key resolution: raw dataset records become insertable rows
//! once their relation markers are swapped for parent ids.

use super::dataset::RawRecord;
use super::plan::{KeyRegistration, KeySource, OrphanPolicy, TablePlan};
use serde_json::{Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// One lookup map per natural-key domain, filled as parents are inserted.
#[derive(Debug, Clone, Default)]
pub struct KeyMaps {
    domains: HashMap<String, HashMap<String, i64>>,
}

impl KeyMaps {
    pub fn normalize(key: &str) -> String {
        key.trim().to_ascii_lowercase()
    }

    /// Record `key -> id`. The first id registered for a key is kept.
    pub fn register(&mut self, domain: &str, key: &str, id: i64) -> bool {
        let map = self.domains.entry(domain.to_string()).or_default();
        match map.entry(Self::normalize(key)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(id);
                true
            }
        }
    }

    pub fn lookup(&self, domain: &str, key: &str) -> Option<i64> {
        self.domains
            .get(domain)
            .and_then(|m| m.get(&Self::normalize(key)))
            .copied()
    }

    pub fn len(&self, domain: &str) -> usize {
        self.domains.get(domain).map_or(0, HashMap::len)
    }
}

/// A record ready for insertion: plain column values only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub columns: Map<String, Value>,
    /// Relations filled by the fallback owner or left NULL.
    pub defaulted: usize,
}

/// Why a record could not be attached to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Orphan {
    pub marker: String,
    pub domain: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedRecord),
    Orphan(Orphan),
}

/// Apply a table's relation rules to one record. Never touches the database.
pub fn resolve(plan: &TablePlan, record: &RawRecord, maps: &KeyMaps) -> Resolution {
    let mut columns = record.fields.clone();
    let mut defaulted = 0;

    for rule in &plan.relations {
        let key = record.marker_key(&rule.marker);
        if let Some(id) = key.and_then(|k| maps.lookup(&rule.domain, k)) {
            columns.insert(rule.column.clone(), Value::from(id));
            continue;
        }

        let orphan = || Orphan {
            marker: rule.marker.clone(),
            domain: rule.domain.clone(),
            key: key.map(str::to_string),
        };

        match rule.on_missing {
            OrphanPolicy::Skip => return Resolution::Orphan(orphan()),
            OrphanPolicy::Null => {
                columns.insert(rule.column.clone(), Value::Null);
                defaulted += 1;
            }
            OrphanPolicy::Fallback => {
                let owner = rule
                    .fallback
                    .as_deref()
                    .and_then(|f| maps.lookup(&rule.domain, f));
                match owner {
                    Some(id) => {
                        columns.insert(rule.column.clone(), Value::from(id));
                        defaulted += 1;
                    }
                    None => return Resolution::Orphan(orphan()),
                }
            }
        }
    }

    Resolution::Resolved(ResolvedRecord { columns, defaulted })
}

/// Natural key a registration reads from an inserted record.
pub fn registration_key<'a>(reg: &KeyRegistration, record: &'a RawRecord) -> Option<&'a str> {
    match reg.source()? {
        KeySource::Column(column) => record.field_str(column),
        KeySource::Marker(field) => record.marker_key(field),
    }
}
