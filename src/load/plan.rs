//! Load plan: which tables to fill, in which order, and how each one's
//! foreign keys are found from natural keys.
//!
//! ```yaml
//! tables:
//!   - table: users
//!     register:
//!       - { domain: user, column: email }
//!   - table: hosts
//!     relations:
//!       - marker: email
//!         domain: profile
//!         column: user_profile_id
//!         on_missing: fallback
//!         fallback: admin@lifedrawing.art
//! ```

use crate::error::{read_file, PlanError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoadPlan {
    pub tables: Vec<TablePlan>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TablePlan {
    pub table: String,
    /// Column handed back by `INSERT ... RETURNING`.
    #[serde(default = "default_returning")]
    pub returning: String,
    #[serde(default)]
    pub relations: Vec<RelationRule>,
    #[serde(default)]
    pub register: Vec<KeyRegistration>,
}

fn default_returning() -> String {
    "id".to_string()
}

/// Resolve `marker` from the record's relation marker through `domain`
/// and store the id in `column`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RelationRule {
    pub marker: String,
    pub domain: String,
    pub column: String,
    #[serde(default)]
    pub on_missing: OrphanPolicy,
    /// Natural key of the owner used by [`OrphanPolicy::Fallback`].
    #[serde(default)]
    pub fallback: Option<String>,
}

/// What happens to a record whose parent cannot be found.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    #[default]
    Skip,
    Fallback,
    Null,
}

/// After an insert, remember `key -> id` in `domain`. The key is read from
/// a column of the record or from a field of its relation marker.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KeyRegistration {
    pub domain: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub marker: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource<'a> {
    Column(&'a str),
    Marker(&'a str),
}

impl KeyRegistration {
    pub fn source(&self) -> Option<KeySource<'_>> {
        match (&self.column, &self.marker) {
            (Some(c), None) => Some(KeySource::Column(c)),
            (None, Some(m)) => Some(KeySource::Marker(m)),
            _ => None,
        }
    }
}

impl LoadPlan {
    pub fn from_yaml(text: &str) -> std::result::Result<Self, PlanError> {
        let plan: LoadPlan = serde_yaml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::from_yaml(&read_file(path)?)?)
    }

    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|t| t.table == name)
    }

    fn validate(&self) -> std::result::Result<(), PlanError> {
        let mut seen = HashSet::new();
        // Domains filled by tables already walked. A table's own
        // registrations only count for the tables after it.
        let mut registered = HashSet::new();

        for t in &self.tables {
            if !seen.insert(t.table.as_str()) {
                return Err(PlanError::DuplicateTable(t.table.clone()));
            }

            let empty = |field: &'static str| PlanError::EmptyField {
                table: t.table.clone(),
                field,
            };

            for rule in &t.relations {
                if rule.marker.trim().is_empty() {
                    return Err(empty("marker"));
                }
                if rule.domain.trim().is_empty() {
                    return Err(empty("domain"));
                }
                if rule.column.trim().is_empty() {
                    return Err(empty("column"));
                }
                let has_fallback = rule.fallback.as_deref().is_some_and(|f| !f.trim().is_empty());
                if rule.on_missing == OrphanPolicy::Fallback && !has_fallback {
                    return Err(empty("fallback"));
                }
                if !registered.contains(rule.domain.as_str()) {
                    return Err(PlanError::UnregisteredDomain {
                        table: t.table.clone(),
                        domain: rule.domain.clone(),
                    });
                }
            }

            for reg in &t.register {
                if reg.domain.trim().is_empty() {
                    return Err(empty("domain"));
                }
                if reg.source().is_none() {
                    return Err(PlanError::AmbiguousRegistration {
                        table: t.table.clone(),
                        domain: reg.domain.clone(),
                    });
                }
            }
            registered.extend(t.register.iter().map(|reg| reg.domain.as_str()));
        }

        Ok(())
    }
}
