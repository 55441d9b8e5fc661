//! PostgreSQL execution adapter using sqlx

use crate::error::{AgentError, Result};
use crate::execution::result::Row;
use crate::execution::ExecutionAdapter;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Decimal;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Create a pool and check it with `SELECT 1`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(classify_sqlx_error)?;

        // Test the connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(classify_sqlx_error)?;

        info!("Connected to PostgreSQL (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionAdapter for PgExecutor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let start_time = std::time::Instant::now();

        // fetch_all acquires a pooled connection and returns it on drop, error or not
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        debug!(
            "Query returned {} row(s) in {}ms",
            rows.len(),
            start_time.elapsed().as_millis()
        );

        Ok(rows.iter().map(convert_row).collect())
    }
}

/// Engine-side failures are recoverable and keep the engine text verbatim;
/// transport and pool failures mean the backend is unreachable.
pub fn classify_sqlx_error(error: sqlx::Error) -> AgentError {
    match error {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => AgentError::Execution(format!("{} (SQLSTATE {})", db.message(), code)),
            None => AgentError::Execution(db.message().to_string()),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => AgentError::Unavailable(error.to_string()),
        other => AgentError::Execution(other.to_string()),
    }
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = decode_value(row, idx, column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn get<T>(row: &PgRow, idx: usize) -> Option<T>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    let column = row.column(idx);
    decoded_or_null(
        row.try_get::<Option<T>, _>(idx),
        column.name(),
        column.type_info().name(),
    )
}

/// A decode failure becomes null, but is logged so it is not mistaken for SQL NULL
fn decoded_or_null<T>(
    decoded: std::result::Result<Option<T>, sqlx::Error>,
    column: &str,
    type_name: &str,
) -> Option<T> {
    match decoded {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Could not decode column '{}' of type {}, returning null: {}",
                column, type_name, e
            );
            None
        }
    }
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    let value = match type_name {
        "INT2" => get::<i16>(row, idx).map(Value::from),
        "INT4" => get::<i32>(row, idx).map(Value::from),
        "INT8" => get::<i64>(row, idx).map(Value::from),
        "FLOAT4" => get::<f32>(row, idx)
            .and_then(|f| serde_json::Number::from_f64(f as f64))
            .map(Value::Number),
        "FLOAT8" => get::<f64>(row, idx)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        // Kept as text so no precision is lost
        "NUMERIC" => get::<Decimal>(row, idx).map(|d| Value::String(d.to_string())),
        "BOOL" => get::<bool>(row, idx).map(Value::Bool),
        "TIMESTAMP" => get::<NaiveDateTime>(row, idx).map(|t| Value::String(t.to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx).map(|t| Value::String(t.to_rfc3339())),
        "DATE" => get::<NaiveDate>(row, idx).map(|d| Value::String(d.to_string())),
        _ => get::<String>(row, idx).map(Value::String),
    };

    value.unwrap_or(Value::Null)
}
