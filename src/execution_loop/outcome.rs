//! Request outcomes and the per-attempt transcript.

use crate::execution::{render_rows, Row};
use crate::execution_loop::error_classifier::FailureClass;
use serde::Serialize;
use uuid::Uuid;

pub const NOT_FOUND_MESSAGE: &str = "I couldn't find the answer to your question, please try again.";
pub const EXECUTION_FAILED_MESSAGE: &str = "Error executing query. Please try again later.";

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub rows: Vec<Row>,
    /// The SQL that produced `rows`
    pub sql: String,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Answered(Answer),
    /// Attempt budget or deadline used up
    Exhausted { message: String, attempts: u32 },
    /// Unrecoverable failure (e.g. database unreachable)
    Failed { message: String, reason: String },
}

impl Outcome {
    pub fn exhausted(attempts: u32) -> Self {
        Outcome::Exhausted {
            message: NOT_FOUND_MESSAGE.to_string(),
            attempts,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            message: EXECUTION_FAILED_MESSAGE.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered(_))
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Outcome::Answered(answer) => Some(answer),
            _ => None,
        }
    }

    /// User-facing text
    pub fn render(&self) -> String {
        match self {
            Outcome::Answered(answer) => render_rows(&answer.rows, &answer.sql),
            Outcome::Exhausted { message, .. } => message.clone(),
            Outcome::Failed { message, .. } => message.clone(),
        }
    }
}

/// One attempt of the retry loop
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub prompt: String,
    pub query_model: Option<serde_json::Value>,
    pub sql: Option<String>,
    pub error: Option<String>,
    pub failure_class: Option<String>,
    pub row_count: Option<usize>,
}

impl AttemptRecord {
    pub(crate) fn new(attempt: u32, prompt: String) -> Self {
        Self {
            attempt,
            prompt,
            query_model: None,
            sql: None,
            error: None,
            failure_class: None,
            row_count: None,
        }
    }

    pub(crate) fn record_failure(&mut self, error: &str, class: &FailureClass) {
        self.error = Some(error.to_string());
        self.failure_class = Some(class.to_string());
    }
}

/// Outcome plus everything the loop did to get there
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: Outcome,
    pub transcript: Vec<AttemptRecord>,
}

impl RunReport {
    pub fn attempts(&self) -> u32 {
        self.transcript.len() as u32
    }
}
