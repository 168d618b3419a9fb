//! Postgres [`Backend`] over a single tokio-postgres connection.

use crate::error::DbError;
use crate::load::Backend;
use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

/// SQLSTATEs raised when a create statement targets an existing object.
const ALREADY_EXISTS: [SqlState; 4] = [
    SqlState::DUPLICATE_TABLE,
    SqlState::INVALID_TABLE_DEFINITION,
    SqlState::DUPLICATE_OBJECT,
    SqlState::DUPLICATE_COLUMN,
];

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(e) = err.as_db_error() {
            if ALREADY_EXISTS.contains(e.code()) {
                DbError::AlreadyExists(e.message().to_string())
            } else {
                DbError::Statement {
                    code: Some(e.code().code().to_string()),
                    message: e.message().to_string(),
                }
            }
        } else if err.is_closed() {
            DbError::Connection(err.to_string())
        } else {
            DbError::Statement {
                code: None,
                message: err.to_string(),
            }
        }
    }
}

pub struct PostgresBackend {
    client: Client,
    _driver: tokio::task::JoinHandle<()>,
}

impl PostgresBackend {
    /// Connect and spawn the connection driver.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection closed: {e}");
            }
        });
        info!("connected to database");

        Ok(Self {
            client,
            _driver: driver,
        })
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn insert(&mut self, sql: &str) -> Result<i64, DbError> {
        let row = self.client.query_opt(sql, &[]).await?.ok_or(DbError::NoId)?;
        let id = match row.try_get::<_, i64>(0) {
            Ok(id) => id,
            Err(_) => i64::from(row.try_get::<_, i32>(0)?),
        };
        Ok(id)
    }
}
