use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Invalid query model: {0}")]
    InvalidQueryModel(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Execution backend unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether the retry loop may feed this failure back to the oracle and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::Oracle(_)
                | AgentError::InvalidQueryModel(_)
                | AgentError::Execution(_)
                | AgentError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
