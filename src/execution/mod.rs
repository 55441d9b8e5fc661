//! Execution Adapter
//!
//! Boundary to the database: SQL text in, rows or a structured failure out.
//! A recoverable engine failure is `AgentError::Execution` with the engine's text;
//! an unreachable backend is `AgentError::Unavailable`.

pub mod postgres;
pub mod result;

use crate::error::Result;
use async_trait::async_trait;

pub use postgres::PgExecutor;
pub use result::{render_rows, Row};

#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Adapter name (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// Execute SQL text. The adapter owns its connection lifecycle and must release
    /// the connection on every exit path.
    async fn execute(&self, sql: &str) -> Result<Vec<Row>>;
}
