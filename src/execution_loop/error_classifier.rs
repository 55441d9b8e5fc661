//! Error Classifier
//!
//! Classifies attempt failures into a taxonomy for recovery prompts.

use crate::error::AgentError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref UNDEFINED_COLUMN: Regex = Regex::new(r#"column "?([A-Za-z0-9_.]+)"? does not exist"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// The oracle produced output that could not be parsed into a query model
    OracleOutput,
    /// The model did not conform to the schema registry
    InvalidQueryModel,
    UndefinedColumn(Option<String>),
    UndefinedTable,
    TypeMismatch,
    SyntaxError,
    Timeout,
    ExecutionError,
    /// Outside the recoverable taxonomy; ends the request
    Fatal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::OracleOutput => write!(f, "OracleOutput"),
            FailureClass::InvalidQueryModel => write!(f, "InvalidQueryModel"),
            FailureClass::UndefinedColumn(Some(column)) => write!(f, "UndefinedColumn({})", column),
            FailureClass::UndefinedColumn(None) => write!(f, "UndefinedColumn"),
            FailureClass::UndefinedTable => write!(f, "UndefinedTable"),
            FailureClass::TypeMismatch => write!(f, "TypeMismatch"),
            FailureClass::SyntaxError => write!(f, "SyntaxError"),
            FailureClass::Timeout => write!(f, "Timeout"),
            FailureClass::ExecutionError => write!(f, "ExecutionError"),
            FailureClass::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &AgentError) -> FailureClass {
        match error {
            AgentError::Oracle(_) => FailureClass::OracleOutput,
            AgentError::InvalidQueryModel(_) => FailureClass::InvalidQueryModel,
            AgentError::Timeout(_) => FailureClass::Timeout,
            AgentError::Execution(message) => self.classify_engine_message(message),
            _ => FailureClass::Fatal,
        }
    }

    /// SQLSTATE codes first, then message patterns
    fn classify_engine_message(&self, message: &str) -> FailureClass {
        let lower = message.to_lowercase();

        if lower.contains("sqlstate 42703") || UNDEFINED_COLUMN.is_match(&lower) {
            let column = UNDEFINED_COLUMN
                .captures(message)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            return FailureClass::UndefinedColumn(column);
        }

        if lower.contains("sqlstate 42p01")
            || (lower.contains("relation") && lower.contains("does not exist"))
        {
            return FailureClass::UndefinedTable;
        }

        if lower.contains("sqlstate 42601") || lower.contains("syntax error") {
            return FailureClass::SyntaxError;
        }

        let type_codes = ["sqlstate 42804", "sqlstate 42883", "sqlstate 22p02", "sqlstate 22007", "sqlstate 22008"];
        if type_codes.iter().any(|code| lower.contains(code))
            || lower.contains("invalid input syntax")
            || lower.contains("operator does not exist")
        {
            return FailureClass::TypeMismatch;
        }

        FailureClass::ExecutionError
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
