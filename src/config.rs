//! Agent Configuration
//!
//! Settings come from the environment (after `.env` is loaded by the binary);
//! command-line flags override the values they name.

use crate::compiler::{is_plain_identifier, DEFAULT_ROW_LIMIT};
use crate::error::{AgentError, Result};
use crate::execution_loop::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TENANT_COLUMN: &str = "organization_id";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub temperature: f64,
    pub max_tokens: u32,

    pub database_url: Option<String>,
    pub db_max_connections: u32,

    pub max_attempts: u32,
    pub row_limit: u32,
    pub tenant_column: String,
    /// Per oracle call / per execution
    pub attempt_timeout: Option<Duration>,
    /// Whole retry loop
    pub deadline: Option<Duration>,

    /// Replaces the built-in schema when set
    pub schema_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            database_url: None,
            db_max_connections: 5,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            row_limit: DEFAULT_ROW_LIMIT,
            tenant_column: DEFAULT_TENANT_COLUMN.to_string(),
            attempt_timeout: None,
            deadline: None,
            schema_path: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            temperature: parse_var(&lookup, "OPENAI_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_var(&lookup, "OPENAI_MAX_TOKENS", defaults.max_tokens)?,
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parse_var(
                &lookup,
                "SQLMEND_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            max_attempts: parse_var(&lookup, "SQLMEND_MAX_ATTEMPTS", defaults.max_attempts)?,
            row_limit: parse_var(&lookup, "SQLMEND_ROW_LIMIT", defaults.row_limit)?,
            tenant_column: non_empty("SQLMEND_TENANT_COLUMN").unwrap_or(defaults.tenant_column),
            attempt_timeout: parse_secs(&lookup, "SQLMEND_ATTEMPT_TIMEOUT_SECS")?,
            deadline: parse_secs(&lookup, "SQLMEND_DEADLINE_SECS")?,
            schema_path: non_empty("SQLMEND_SCHEMA_PATH").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AgentError::Config(
                "SQLMEND_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.row_limit == 0 {
            return Err(AgentError::Config(
                "SQLMEND_ROW_LIMIT must be at least 1".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(AgentError::Config(
                "SQLMEND_DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if !is_plain_identifier(&self.tenant_column) {
            return Err(AgentError::Config(format!(
                "SQLMEND_TENANT_COLUMN '{}' is not a plain identifier",
                self.tenant_column
            )));
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".to_string()))
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AgentError::Config("DATABASE_URL is not set".to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: self.attempt_timeout,
            deadline: self.deadline,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("Invalid {}='{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: Option<u64> = match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => Some(
            raw.trim()
                .parse()
                .map_err(|e| AgentError::Config(format!("Invalid {}='{}': {}", key, raw, e)))?,
        ),
        None => None,
    };
    Ok(secs.filter(|s| *s > 0).map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AgentConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.row_limit, 10);
        assert_eq!(config.tenant_column, "organization_id");
        assert_eq!(config.openai_model, DEFAULT_MODEL);
        assert!(config.attempt_timeout.is_none());
        assert!(config.require_api_key().is_err());
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/parkstreet"),
            ("SQLMEND_MAX_ATTEMPTS", "5"),
            ("SQLMEND_ATTEMPT_TIMEOUT_SECS", "20"),
            ("SQLMEND_TENANT_COLUMN", "team_id"),
        ])
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.tenant_column, "team_id");

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("SQLMEND_MAX_ATTEMPTS", "three")]),
            Err(AgentError::Config(_))
        ));
        assert!(config_from(&[("SQLMEND_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config_from(&[("SQLMEND_TENANT_COLUMN", "org id")]).is_err());
    }
}
