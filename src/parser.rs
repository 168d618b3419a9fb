use crate::ast::*;
use crate::lexer::{split_column, split_settings, unquote, Lexer, Line, LineKind};
use tracing::debug;

/// Which block the cursor is inside. Indices point into the model being built.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    Top,
    Enum(usize),
    Table(usize),
}

/// Permissive single-pass parser: lines it cannot make sense of are
/// dropped, never reported as errors.
pub struct Parser {
    lines: Vec<Line>,
    pos: usize,
    block: Block,
    /// Depth of blocks being skipped (`indexes { ... }` and friends).
    nested: usize,
    model: SchemaModel,
}

pub fn parse_schema(input: &str) -> SchemaModel {
    Parser::new(input).parse()
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            lines: Lexer::new(input).tokenize(),
            pos: 0,
            block: Block::Top,
            nested: 0,
            model: SchemaModel::default(),
        }
    }

    fn advance(&mut self) -> Option<Line> {
        let line = self.lines.get(self.pos).cloned();
        self.pos += 1;
        line
    }

    pub fn parse(&mut self) -> SchemaModel {
        while let Some(line) = self.advance() {
            if self.nested > 0 {
                match line.kind {
                    LineKind::Close => self.nested -= 1,
                    LineKind::BlockOpen | LineKind::EnumOpen(_) | LineKind::TableOpen(_) => {
                        self.nested += 1
                    }
                    _ => {}
                }
                continue;
            }

            match line.kind {
                LineKind::EnumOpen(name) => self.open_enum(name),
                LineKind::TableOpen(name) => self.open_table(name),
                LineKind::Close => self.block = Block::Top,
                LineKind::BlockOpen => {
                    debug!(line = line.number, "skipping nested block");
                    self.nested = 1;
                }
                LineKind::Ref(text) => match parse_ref(&text) {
                    Some(rel) => self.model.relationships.push(rel),
                    None => debug!(line = line.number, "ignoring unrecognised ref"),
                },
                LineKind::Body(text) => self.parse_body(line.number, &text),
            }
        }

        self.block = Block::Top;
        std::mem::take(&mut self.model)
    }

    fn open_enum(&mut self, name: String) {
        let idx = match self.model.enums.iter().position(|e| e.name == name) {
            Some(idx) => idx,
            None => {
                self.model.enums.push(EnumDef {
                    name,
                    values: Vec::new(),
                });
                self.model.enums.len() - 1
            }
        };
        self.block = Block::Enum(idx);
    }

    fn open_table(&mut self, name: String) {
        let idx = match self.model.tables.iter().position(|t| t.name == name) {
            Some(idx) => idx,
            None => {
                self.model.tables.push(TableDef {
                    name,
                    columns: Vec::new(),
                });
                self.model.tables.len() - 1
            }
        };
        self.block = Block::Table(idx);
    }

    fn parse_body(&mut self, number: usize, text: &str) {
        match self.block {
            Block::Top => debug!(line = number, "ignoring line outside any block"),
            Block::Enum(idx) => {
                let value = text.split_whitespace().next().map(unquote).unwrap_or_default();
                if !value.is_empty() {
                    self.model.enums[idx].values.push(value.to_string());
                }
            }
            Block::Table(idx) => match split_column(text) {
                Some(tokens) => {
                    let table = self.model.tables[idx].name.clone();
                    let mut column = ColumnDef::new(tokens.name, tokens.typ);
                    if let Some(settings) = tokens.settings {
                        for setting in split_settings(settings) {
                            self.apply_setting(&table, &mut column, &setting);
                        }
                    }
                    self.model.tables[idx].columns.push(column);
                }
                None => debug!(line = number, "skipping malformed column"),
            },
        }
    }

    fn apply_setting(&mut self, table: &str, column: &mut ColumnDef, setting: &str) {
        let normalized = setting
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "primary key" | "pk" => column.primary_key = true,
            "not null" => column.not_null = true,
            "unique" => column.unique = true,
            "increment" => column.increment = true,
            s if s.starts_with("default:") => {
                let value = setting.trim()["default:".len()..].trim();
                let raw = unquote(value);
                column.default = Some(DefaultValue {
                    raw: raw.to_string(),
                    quoted: raw.len() != value.len(),
                });
            }
            s if s.starts_with("ref:") => {
                let target = setting.trim()["ref:".len()..].trim();
                if let Some(rel) = inline_ref(table, &column.name, target) {
                    self.model.relationships.push(rel);
                }
            }
            _ => {}
        }
    }
}

/// `"table"."column"` with optional quotes.
fn parse_endpoint(s: &str) -> Option<(String, String)> {
    let s = s.trim();
    let mut quote: Option<char> = None;
    let mut split = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '`' => quote = Some(c),
            None if c == '.' => {
                split = Some(i);
                break;
            }
            None => {}
        }
    }

    let i = split?;
    let (raw_table, raw_column) = (&s[..i], &s[i + 1..]);
    let (table, column) = (unquote(raw_table), unquote(raw_column));

    // Quoted names may hold anything; bare ones must be plain identifiers.
    let valid = |raw: &str, name: &str| {
        !name.is_empty()
            && (raw.trim().len() != name.len()
                || name.chars().all(|c| c.is_alphanumeric() || c == '_'))
    };
    if valid(raw_table, table) && valid(raw_column, column) {
        Some((table.to_string(), column.to_string()))
    } else {
        None
    }
}

/// `"from"."col" < "to"."col"`
fn parse_ref(text: &str) -> Option<RelationshipDef> {
    let (from, to) = text.split_once('<')?;
    let (from_table, from_column) = parse_endpoint(from)?;
    let (to_table, to_column) = parse_endpoint(to)?;
    Some(RelationshipDef {
        from_table,
        from_column,
        to_table,
        to_column,
    })
}

/// Column-level `ref: > table.col` (this column references the target) or
/// `ref: < table.col` (the target references this column).
fn inline_ref(table: &str, column: &str, target: &str) -> Option<RelationshipDef> {
    let (outgoing, rest) = match target.chars().next()? {
        '>' => (true, &target[1..]),
        '<' => (false, &target[1..]),
        _ => return None,
    };
    let (other_table, other_column) = parse_endpoint(rest)?;

    let rel = if outgoing {
        RelationshipDef {
            from_table: table.to_string(),
            from_column: column.to_string(),
            to_table: other_table,
            to_column: other_column,
        }
    } else {
        RelationshipDef {
            from_table: other_table,
            from_column: other_column,
            to_table: table.to_string(),
            to_column: column.to_string(),
        }
    };
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATFORM: &str = r#"
        // booking platform core
        enum status_enum {
            pending
            confirmed // booked
            'opencall'
        }

        Table users {
            id integer [primary key, increment]
            email varchar(255) [not null, unique]
            is_admin boolean [default: false]
            date_created timestamp [default: `now()`]
        }

        table user_profiles {
            id integer [pk, increment]
            user_id integer [not null]
            handle varchar [note: 'public, url safe']
            indexes {
                (user_id, handle) [unique]
            }
            fullname varchar
        }

        Ref: "user_profiles"."user_id" < "users"."id"
        Ref: this is not a relationship
    "#;

    #[test]
    fn test_parse_enum() {
        let model = parse_schema(PLATFORM);
        assert_eq!(model.enums.len(), 1);
        assert_eq!(model.enums[0].name, "status_enum");
        assert_eq!(model.enums[0].values, vec!["pending", "confirmed", "opencall"]);
    }

    #[test]
    fn test_parse_tables() {
        let model = parse_schema(PLATFORM);
        assert_eq!(model.tables.len(), 2);

        let users = &model.tables[0];
        assert_eq!(users.name, "users");
        let names: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "is_admin", "date_created"]);

        let id = &users.columns[0];
        assert!(id.primary_key && id.increment);
        assert!(!id.not_null && !id.unique);

        let email = &users.columns[1];
        assert_eq!(email.typ, "varchar(255)");
        assert!(email.not_null && email.unique);

        assert_eq!(
            users.columns[3].default,
            Some(DefaultValue {
                raw: "now()".into(),
                quoted: true,
            })
        );
    }

    #[test]
    fn test_nested_block_keeps_table_open() {
        let model = parse_schema(PLATFORM);
        let profiles = model.table("user_profiles").unwrap();
        let names: Vec<&str> = profiles.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "user_id", "handle", "fullname"]);
    }

    #[test]
    fn test_parse_relationships() {
        let model = parse_schema(PLATFORM);
        assert_eq!(
            model.relationships,
            vec![RelationshipDef {
                from_table: "user_profiles".into(),
                from_column: "user_id".into(),
                to_table: "users".into(),
                to_column: "id".into(),
            }]
        );
    }

    #[test]
    fn test_malformed_columns_are_skipped() {
        let model = parse_schema(
            "table venues {\n  id integer [pk]\n  name\n  Note: 'curated list'\n  tz varchar junk\n  city varchar\n}",
        );
        let names: Vec<&str> = model.tables[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "city"]);
    }

    #[test]
    fn test_default_with_embedded_comma() {
        let model = parse_schema(
            "table events {\n  pricing_table json [default: '[\"General Admission\", 10]', not null]\n  note text [default: 'a,b']\n}",
        );
        let cols = &model.tables[0].columns;
        assert_eq!(cols[0].default.as_ref().unwrap().raw, "[\"General Admission\", 10]");
        assert!(cols[0].not_null);
        assert_eq!(cols[1].default.as_ref().unwrap().raw, "a,b");
    }

    #[test]
    fn test_settings_are_case_insensitive() {
        let model = parse_schema("table t {\n  id INT [Primary  Key, NOT NULL, Increment, Default: 3]\n}");
        let id = &model.tables[0].columns[0];
        assert!(id.primary_key && id.not_null && id.increment);
        assert_eq!(
            id.default,
            Some(DefaultValue {
                raw: "3".into(),
                quoted: false,
            })
        );
    }

    #[test]
    fn test_inline_ref() {
        let model = parse_schema(
            "table hosts {\n  user_profile_id integer [ref: > user_profiles.id]\n  id integer [ref: < events.host_id]\n}",
        );
        assert_eq!(model.relationships.len(), 2);
        assert_eq!(model.relationships[0].from_table, "hosts");
        assert_eq!(model.relationships[0].to_table, "user_profiles");
        assert_eq!(model.relationships[1].from_table, "events");
        assert_eq!(model.relationships[1].from_column, "host_id");
        assert_eq!(model.relationships[1].to_column, "id");
    }

    #[test]
    fn test_repeated_table_block_is_merged() {
        let model = parse_schema("table t {\n  a int\n}\ntable t {\n  b int\n}\nenum e {\n  x\n}\nenum e {\n  y\n}");
        assert_eq!(model.tables.len(), 1);
        assert_eq!(model.tables[0].columns.len(), 2);
        assert_eq!(model.enums[0].values, vec!["x", "y"]);
    }

    #[test]
    fn test_top_level_noise_is_ignored() {
        let model = parse_schema("Project booking {\n  database_type: 'PostgreSQL'\n}\nstray words here\n");
        assert_eq!(model, SchemaModel::default());
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse_schema(PLATFORM), parse_schema(PLATFORM));
    }
}
