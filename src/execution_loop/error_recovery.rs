//! Error Recovery
//!
//! Builds the per-attempt prompt. After a failed attempt the prompt carries the
//! previous query, the verbatim error text and a hint derived from its classification.

use crate::execution_loop::error_classifier::FailureClass;
use crate::query::QueryModel;
use crate::schema::{SchemaRegistry, Table};
use std::sync::Arc;

/// What the next attempt needs to know about the one that just failed
#[derive(Debug, Clone)]
pub struct PreviousAttempt {
    pub query: Option<QueryModel>,
    pub sql: Option<String>,
    pub error: String,
    pub class: FailureClass,
}

impl PreviousAttempt {
    /// Compiled SQL when compilation got that far, otherwise the model itself
    pub fn rendered_query(&self) -> Option<String> {
        self.sql
            .clone()
            .or_else(|| self.query.as_ref().map(|q| q.to_string()))
    }
}

/// Recovery prompt builder
pub struct ErrorRecovery {
    registry: Arc<SchemaRegistry>,
}

impl ErrorRecovery {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn build_prompt(
        &self,
        question: &str,
        expected_answer: &str,
        previous: Option<&PreviousAttempt>,
    ) -> String {
        let mut prompt = format!(
            "Write a query to answer the following question: {}\nExpected Answer: {}",
            question, expected_answer
        );

        if let Some(previous) = previous {
            prompt.push_str("\n\n");
            prompt.push_str(&self.build_recovery_section(previous));
        }

        prompt
    }

    fn build_recovery_section(&self, previous: &PreviousAttempt) -> String {
        let mut parts = Vec::new();

        match previous.rendered_query() {
            Some(rendered) => {
                parts.push("The previous query was not correct, please try again.".to_string());
                parts.push(format!("The previous query was: {}", rendered));
            }
            None => {
                parts.push("The previous attempt did not produce a usable query.".to_string());
            }
        }

        parts.push(format!("The error message was: {}", previous.error));

        if let Some(hint) = self.hint(previous) {
            parts.push(hint);
        }

        parts.push("Please correct the query and try again.".to_string());
        parts.join("\n")
    }

    fn hint(&self, previous: &PreviousAttempt) -> Option<String> {
        let table = previous.query.as_ref().map(|q| q.table_name);

        match &previous.class {
            FailureClass::OracleOutput => Some(
                "Respond by calling build_sql_query with arguments that match its schema."
                    .to_string(),
            ),
            FailureClass::InvalidQueryModel => {
                table.map(|t| self.valid_columns_hint(t))
            }
            FailureClass::UndefinedColumn(_) => table.map(|t| self.valid_columns_hint(t)),
            FailureClass::UndefinedTable => Some(format!(
                "Valid tables are: {}",
                self.registry
                    .tables()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            FailureClass::TypeMismatch => Some(
                "Compare each column with a value of its declared type from the semantic model."
                    .to_string(),
            ),
            FailureClass::Timeout => Some(
                "The previous attempt took too long. Prefer a simpler query with tighter conditions."
                    .to_string(),
            ),
            FailureClass::SyntaxError | FailureClass::ExecutionError | FailureClass::Fatal => None,
        }
    }

    fn valid_columns_hint(&self, table: Table) -> String {
        format!(
            "Valid columns for table '{}' are: {}",
            table,
            self.registry.columns(table).join(", ")
        )
    }
}
