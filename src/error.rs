use std::path::PathBuf;

/// Failures reported by a [`crate::load::Backend`].
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The object a create statement targets is already there.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("statement failed{}: {message}", code_suffix(.code))]
    Statement {
        code: Option<String>,
        message: String,
    },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("insert returned no id")]
    NoId,
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid load plan: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("load plan lists table \"{0}\" more than once")]
    DuplicateTable(String),
    #[error("load plan entry \"{table}\" has an empty {field}")]
    EmptyField { table: String, field: &'static str },
    #[error("load plan entry \"{table}\" resolves through domain \"{domain}\", which no earlier table registers")]
    UnregisteredDomain { table: String, domain: String },
    #[error("key registration for domain \"{domain}\" on \"{table}\" needs exactly one of column or marker")]
    AmbiguousRegistration { table: String, domain: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset must be a JSON object keyed by table name")]
    RootNotAnObject,
    #[error("dataset entry \"{0}\" is not an array of records")]
    NotAnArray(String),
    #[error("record {index} of \"{table}\" is not an object")]
    NotAnObject { table: String, index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no database URL: pass --database-url or set NETLIFY_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("schema statement failed, aborting: {statement}: {source}")]
    SchemaAborted { statement: String, source: DbError },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Read a whole input file, keeping the path for the error message.
pub fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
