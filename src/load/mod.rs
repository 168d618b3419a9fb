//! Sequential schema application and dataset loading.
//!
//! Every statement is awaited before the next one is issued. Nothing here
//! batches, retries or runs in parallel.

pub mod dataset;
pub mod plan;
pub mod resolve;

pub use dataset::{Dataset, RawRecord, RelationMarker};
pub use plan::{KeyRegistration, KeySource, LoadPlan, OrphanPolicy, RelationRule, TablePlan};
pub use resolve::{resolve, KeyMaps, Orphan, Resolution, ResolvedRecord};

use crate::ast::SchemaModel;
use crate::ddl::Statement;
use crate::error::{DbError, Error, Result};
use crate::sql::{json_literal, quote_ident};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

#[async_trait]
pub trait Backend: Send {
    /// Run a statement that returns no rows.
    async fn execute(&mut self, sql: &str) -> std::result::Result<(), DbError>;
    /// Run an `INSERT ... RETURNING` and hand back the returned id.
    async fn insert(&mut self, sql: &str) -> std::result::Result<i64, DbError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub applied: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Run statements in order. Objects that already exist are noted and
/// skipped. Other failures are logged and skipped unless `strict`, in which
/// case the first one aborts the run.
pub async fn apply_schema<B: Backend + ?Sized>(
    backend: &mut B,
    statements: &[Statement],
    strict: bool,
) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();
    let total = statements.len();

    for (i, stmt) in statements.iter().enumerate() {
        match backend.execute(&stmt.sql).await {
            Ok(()) => {
                report.applied += 1;
                debug!("{}/{} {} {}", i + 1, total, stmt.kind, stmt.object);
            }
            Err(DbError::AlreadyExists(msg)) => {
                report.existing += 1;
                warn!("{}/{} {} {}: skipped, {}", i + 1, total, stmt.kind, stmt.object, msg);
            }
            Err(e) if strict => {
                return Err(Error::SchemaAborted {
                    statement: format!("{} {}", stmt.kind, stmt.object),
                    source: e,
                });
            }
            Err(e) => {
                report.failed += 1;
                warn!("{}/{} {} {}: {}", i + 1, total, stmt.kind, stmt.object, e);
            }
        }
    }

    info!(
        applied = report.applied,
        existing = report.existing,
        failed = report.failed,
        "schema applied"
    );
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub inserted: usize,
    pub orphaned: usize,
    /// Inserted rows that needed the fallback owner or a NULL parent.
    pub defaulted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }
}

/// `INSERT INTO "t" ("a", "b") VALUES (..) RETURNING "id"`
pub fn insert_sql(table: &str, columns: &Map<String, Value>, returning: &str) -> String {
    if columns.is_empty() {
        return format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quote_ident(table),
            quote_ident(returning)
        );
    }

    let names: Vec<String> = columns.keys().map(|k| quote_ident(k)).collect();
    let values: Vec<String> = columns.values().map(json_literal).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote_ident(table),
        names.join(", "),
        values.join(", "),
        quote_ident(returning)
    )
}

/// Loads dataset tables in plan order, registering natural keys as parents
/// are inserted so later tables can resolve against them.
pub struct Loader<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    plan: &'a LoadPlan,
    model: Option<&'a SchemaModel>,
    maps: KeyMaps,
}

impl<'a, B: Backend + ?Sized> Loader<'a, B> {
    pub fn new(backend: &'a mut B, plan: &'a LoadPlan) -> Self {
        Self {
            backend,
            plan,
            model: None,
            maps: KeyMaps::default(),
        }
    }

    /// Restrict inserted columns to those the schema declares.
    pub fn with_model(mut self, model: &'a SchemaModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn key_maps(&self) -> &KeyMaps {
        &self.maps
    }

    pub async fn load(&mut self, dataset: &Dataset) -> LoadReport {
        for name in dataset.table_names() {
            if self.plan.table(name).is_none() {
                warn!(table = name, "dataset table has no load plan entry, ignoring");
            }
        }

        let mut report = LoadReport::default();
        let plan = self.plan;
        for table_plan in &plan.tables {
            if let Some(model) = self.model {
                if model.table(&table_plan.table).is_none() {
                    warn!(table = %table_plan.table, "table not in schema, skipping");
                    continue;
                }
            }
            let table_report = self
                .load_table(table_plan, dataset.records(&table_plan.table))
                .await;
            report.tables.push(table_report);
        }

        info!(inserted = report.inserted(), "dataset loaded");
        report
    }

    async fn load_table(&mut self, plan: &TablePlan, records: &[RawRecord]) -> TableReport {
        let mut report = TableReport {
            table: plan.table.clone(),
            ..TableReport::default()
        };
        info!(table = %plan.table, records = records.len(), "loading");
        self.warn_missing_columns(plan);

        for (index, record) in records.iter().enumerate() {
            let resolved = match resolve(plan, record, &self.maps) {
                Resolution::Resolved(r) => r,
                Resolution::Orphan(orphan) => {
                    report.orphaned += 1;
                    warn!(
                        table = %plan.table,
                        index,
                        marker = %orphan.marker,
                        key = orphan.key.as_deref().unwrap_or("<none>"),
                        "no {} parent, skipping record",
                        orphan.domain
                    );
                    continue;
                }
            };

            let columns = self.known_columns(plan, resolved.columns);
            let sql = insert_sql(&plan.table, &columns, &plan.returning);

            match self.backend.insert(&sql).await {
                Ok(id) => {
                    report.inserted += 1;
                    if resolved.defaulted > 0 {
                        report.defaulted += 1;
                    }
                    for reg in &plan.register {
                        match resolve::registration_key(reg, record) {
                            Some(key) => {
                                if !self.maps.register(&reg.domain, key, id) {
                                    debug!(domain = %reg.domain, key, "natural key already registered");
                                }
                            }
                            None => debug!(table = %plan.table, index, domain = %reg.domain, "record has no natural key"),
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(table = %plan.table, index, "insert failed: {}", e);
                }
            }
        }

        info!(
            table = %plan.table,
            inserted = report.inserted,
            orphaned = report.orphaned,
            failed = report.failed,
            "table loaded"
        );
        report
    }

    /// Columns the plan writes or reads keys from, but the schema table
    /// lacks. Relation columns are still sent so the backend rejects them.
    fn warn_missing_columns(&self, plan: &TablePlan) {
        let Some(def) = self.model.and_then(|m| m.table(&plan.table)) else {
            return;
        };
        for rule in &plan.relations {
            if def.column(&rule.column).is_none() {
                warn!(table = %plan.table, column = %rule.column, "relation column not in schema");
            }
        }
        for reg in &plan.register {
            if let Some(KeySource::Column(column)) = reg.source() {
                if def.column(column).is_none() {
                    warn!(table = %plan.table, column, "key column not in schema");
                }
            }
        }
    }

    fn known_columns(&self, plan: &TablePlan, mut columns: Map<String, Value>) -> Map<String, Value> {
        let Some(def) = self.model.and_then(|m| m.table(&plan.table)) else {
            return columns;
        };
        columns.retain(|name, _| {
            let known = def.column(name).is_some() || plan.relations.iter().any(|r| &r.column == name);
            if !known {
                debug!(table = %plan.table, column = %name, "dropping field not in schema");
            }
            known
        });
        columns
    }
}
