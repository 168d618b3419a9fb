pub mod ast;
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod db;
pub mod ddl;
pub mod error;
pub mod lexer;
pub mod load;
pub mod parser;
pub mod report;
pub mod sql;

use wasm_bindgen::prelude::*;

use parser::parse_schema;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile a schema description to a DDL script, optionally preceded by
/// the drop statements.
#[wasm_bindgen(js_name = "schemaToDdl")]
pub fn schema_to_ddl(source: &str, drop: Option<bool>) -> String {
    let model = parse_schema(source);
    let mut statements = Vec::new();
    if drop.unwrap_or(false) {
        statements.extend(ddl::drop_statements(&model));
    }
    statements.extend(ddl::generate(&model));
    ddl::to_script(&statements)
}

/// Each generated statement as its own string, in execution order.
#[wasm_bindgen(js_name = "schemaStatements")]
pub fn schema_statements(source: &str) -> js_sys::Array {
    ddl::generate(&parse_schema(source))
        .into_iter()
        .map(|s| JsValue::from(s.sql))
        .collect()
}
