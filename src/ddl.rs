//! DDL generation from a parsed schema model.
//!
//! Statements come out in execution order: enum types, then tables, then
//! foreign keys. Callers must run them one at a time in that order.

use crate::ast::{ColumnDef, EnumDef, RelationshipDef, SchemaModel, TableDef};
use crate::sql::{column_type, quote_ident, quote_str, render_default};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    DropTable,
    DropType,
    CreateType,
    CreateTable,
    AddForeignKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Table or type the statement acts on.
    pub object: String,
    pub sql: String,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DropTable => "drop table",
            Self::DropType => "drop type",
            Self::CreateType => "create type",
            Self::CreateTable => "create table",
            Self::AddForeignKey => "add foreign key",
        };
        f.write_str(s)
    }
}

/// Generate the create statements for a model.
pub fn generate(model: &SchemaModel) -> Vec<Statement> {
    let mut statements = Vec::with_capacity(
        model.enums.len() + model.tables.len() + model.relationships.len(),
    );

    statements.extend(model.enums.iter().map(create_type));
    statements.extend(model.tables.iter().map(|t| create_table(model, t)));
    statements.extend(model.relationships.iter().map(add_foreign_key));

    statements
}

/// Drop everything `generate` creates: tables in reverse declaration
/// order, then types.
pub fn drop_statements(model: &SchemaModel) -> Vec<Statement> {
    let tables = model.tables.iter().rev().map(|t| Statement {
        kind: StatementKind::DropTable,
        object: t.name.clone(),
        sql: format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(&t.name)),
    });
    let types = model.enums.iter().map(|e| Statement {
        kind: StatementKind::DropType,
        object: e.name.clone(),
        sql: format!("DROP TYPE IF EXISTS {} CASCADE", quote_ident(&e.name)),
    });
    tables.chain(types).collect()
}

/// Join statements into a script, each terminated by `;`.
pub fn to_script(statements: &[Statement]) -> String {
    let mut output = String::new();
    for (i, stmt) in statements.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&stmt.sql);
        output.push_str(";\n");
    }
    output
}

fn create_type(e: &EnumDef) -> Statement {
    let values: Vec<String> = e.values.iter().map(|v| quote_str(v)).collect();
    Statement {
        kind: StatementKind::CreateType,
        object: e.name.clone(),
        sql: format!(
            "CREATE TYPE {} AS ENUM ({})",
            quote_ident(&e.name),
            values.join(", ")
        ),
    }
}

fn create_table(model: &SchemaModel, table: &TableDef) -> Statement {
    let mut sql = format!("CREATE TABLE {} (", quote_ident(&table.name));

    for (i, column) in table.columns.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str("\n  ");
        sql.push_str(&column_clause(model, column));
    }
    if !table.columns.is_empty() {
        sql.push('\n');
    }
    sql.push(')');

    Statement {
        kind: StatementKind::CreateTable,
        object: table.name.clone(),
        sql,
    }
}

/// `"name" TYPE [PRIMARY KEY] [NOT NULL] [UNIQUE] [DEFAULT v]`
pub fn column_clause(model: &SchemaModel, column: &ColumnDef) -> String {
    let typ = column_type(&column.typ, column.increment, model.is_enum(&column.typ));
    let mut clause = format!("{} {}", quote_ident(&column.name), typ);

    if column.primary_key {
        clause.push_str(" PRIMARY KEY");
    }
    if column.not_null {
        clause.push_str(" NOT NULL");
    }
    if column.unique {
        clause.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        clause.push_str(" DEFAULT ");
        clause.push_str(&render_default(default));
    }

    clause
}

fn add_foreign_key(rel: &RelationshipDef) -> Statement {
    Statement {
        kind: StatementKind::AddForeignKey,
        object: rel.from_table.clone(),
        sql: format!(
            "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&rel.from_table),
            quote_ident(&rel.from_column),
            quote_ident(&rel.to_table),
            quote_ident(&rel.to_column)
        ),
    }
}
