use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    pub enums: Vec<EnumDef>,
    pub tables: Vec<TableDef>,
    /// Foreign-key edges, in declaration order.
    pub relationships: Vec<RelationshipDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub typ: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub increment: bool,
    pub default: Option<DefaultValue>,
}

/// A `default:` literal with its surrounding quotes removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub raw: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

/// `from_table.from_column` holds the foreign key, `to_table.to_column` is referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDef {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaIssue {
    UnknownTable {
        relationship: String,
        table: String,
    },
    UnknownColumn {
        relationship: String,
        table: String,
        column: String,
    },
    DuplicateColumn {
        table: String,
        column: String,
    },
    EmptyEnum(String),
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTable {
                relationship,
                table,
            } => write!(f, "{relationship}: unknown table \"{table}\""),
            Self::UnknownColumn {
                relationship,
                table,
                column,
            } => write!(f, "{relationship}: unknown column \"{table}\".\"{column}\""),
            Self::DuplicateColumn { table, column } => {
                write!(f, "table \"{table}\" declares column \"{column}\" more than once")
            }
            Self::EmptyEnum(name) => write!(f, "enum \"{name}\" has no values"),
        }
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            primary_key: false,
            not_null: false,
            unique: false,
            increment: false,
            default: None,
        }
    }
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl RelationshipDef {
    pub fn label(&self) -> String {
        format!(
            "\"{}\".\"{}\" < \"{}\".\"{}\"",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

impl SchemaModel {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enum_def(name).is_some()
    }

    /// Checks that the parser deliberately leaves to the caller.
    pub fn validate(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        for e in &self.enums {
            if e.values.is_empty() {
                issues.push(SchemaIssue::EmptyEnum(e.name.clone()));
            }
        }

        for table in &self.tables {
            let mut seen = HashSet::new();
            for column in &table.columns {
                if !seen.insert(column.name.as_str()) {
                    issues.push(SchemaIssue::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for rel in &self.relationships {
            let endpoints = [
                (&rel.from_table, &rel.from_column),
                (&rel.to_table, &rel.to_column),
            ];
            for (table, column) in endpoints {
                match self.table(table) {
                    None => issues.push(SchemaIssue::UnknownTable {
                        relationship: rel.label(),
                        table: table.clone(),
                    }),
                    Some(t) if t.column(column).is_none() => {
                        issues.push(SchemaIssue::UnknownColumn {
                            relationship: rel.label(),
                            table: table.clone(),
                            column: column.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(from: (&str, &str), to: (&str, &str)) -> RelationshipDef {
        RelationshipDef {
            from_table: from.0.to_string(),
            from_column: from.1.to_string(),
            to_table: to.0.to_string(),
            to_column: to.1.to_string(),
        }
    }

    fn model() -> SchemaModel {
        SchemaModel {
            enums: vec![EnumDef {
                name: "status_enum".to_string(),
                values: vec!["pending".to_string()],
            }],
            tables: vec![
                TableDef {
                    name: "users".to_string(),
                    columns: vec![ColumnDef::new("id", "integer")],
                },
                TableDef {
                    name: "user_profiles".to_string(),
                    columns: vec![
                        ColumnDef::new("id", "integer"),
                        ColumnDef::new("user_id", "integer"),
                    ],
                },
            ],
            relationships: vec![rel(("user_profiles", "user_id"), ("users", "id"))],
        }
    }

    #[test]
    fn test_valid_model_has_no_issues() {
        assert!(model().validate().is_empty());
    }

    #[test]
    fn test_unknown_relationship_endpoints() {
        let mut m = model();
        m.relationships.push(rel(("events", "host_id"), ("users", "uuid")));

        let issues = m.validate();
        assert_eq!(issues.len(), 2);
        assert!(matches!(&issues[0], SchemaIssue::UnknownTable { table, .. } if table == "events"));
        assert!(
            matches!(&issues[1], SchemaIssue::UnknownColumn { column, .. } if column == "uuid")
        );
    }

    #[test]
    fn test_duplicate_column_and_empty_enum() {
        let mut m = model();
        m.tables[0].columns.push(ColumnDef::new("id", "bigint"));
        m.enums.push(EnumDef {
            name: "week_day_enum".to_string(),
            values: vec![],
        });

        let issues = m.validate();
        assert!(issues.contains(&SchemaIssue::EmptyEnum("week_day_enum".to_string())));
        assert!(issues.contains(&SchemaIssue::DuplicateColumn {
            table: "users".to_string(),
            column: "id".to_string(),
        }));
    }

    #[test]
    fn test_issue_display() {
        let issue = SchemaIssue::UnknownTable {
            relationship: rel(("a", "b"), ("c", "d")).label(),
            table: "c".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "\"a\".\"b\" < \"c\".\"d\": unknown table \"c\""
        );
    }
}
