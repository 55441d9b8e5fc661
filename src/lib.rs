pub mod compiler;
pub mod config;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod llm;
pub mod oracle;
pub mod query;
pub mod schema;

pub use error::{AgentError, Result};
