//! Postgres spelling of types, identifiers and literals.

mod literal;
mod types;

pub use literal::{json_literal, quote_ident, quote_str, render_default};
pub use types::{column_type, map_type, serial_type};
