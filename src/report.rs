//! Plain-text summary of a parsed model, aligned by display width so
//! full-width names line up in a terminal.

use crate::ast::{ColumnDef, SchemaModel};
use unicode_width::UnicodeWidthStr;

pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(fill))
}

fn flags(column: &ColumnDef) -> Vec<String> {
    let mut flags = Vec::new();
    if column.primary_key {
        flags.push("pk".to_string());
    }
    if column.increment {
        flags.push("increment".to_string());
    }
    if column.unique {
        flags.push("unique".to_string());
    }
    if column.not_null {
        flags.push("not null".to_string());
    }
    if let Some(default) = &column.default {
        flags.push(format!("default {}", default.raw));
    }
    flags
}

pub fn summarize(model: &SchemaModel) -> String {
    let mut lines = Vec::new();

    for e in &model.enums {
        lines.push(format!("enum {}: {}", e.name, e.values.join(", ")));
    }

    for table in &model.tables {
        lines.push(format!("table {}", table.name));

        let name_width = table.columns.iter().map(|c| display_width(&c.name)).max().unwrap_or(0);
        let type_width = table.columns.iter().map(|c| display_width(&c.typ)).max().unwrap_or(0);

        for column in &table.columns {
            let line = format!(
                "  {}  {}  {}",
                pad(&column.name, name_width),
                pad(&column.typ, type_width),
                flags(column).join(" ")
            );
            lines.push(line.trim_end().to_string());
        }
    }

    for rel in &model.relationships {
        lines.push(format!("ref {}", rel.label()));
    }

    lines.push(format!(
        "{} enums, {} tables, {} relationships",
        model.enums.len(),
        model.tables.len(),
        model.relationships.len()
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
