//! Query Model Validation
//!
//! Checks a proposed model against the schema registry before it is compiled, so an
//! invented table or column never reaches the database. All problems are reported in
//! one error so the oracle can fix them together on the next attempt.

use crate::error::{AgentError, Result};
use crate::query::model::{QueryModel, Value};
use crate::schema::{ColumnType, SchemaRegistry, Table};

impl QueryModel {
    pub fn validate(&self, registry: &SchemaRegistry) -> Result<()> {
        let table = self.table_name;
        if !registry.contains_table(table) {
            return Err(AgentError::InvalidQueryModel(format!(
                "Table '{}' is not described in the schema registry",
                table
            )));
        }

        let mut problems = Vec::new();

        for column in &self.columns {
            check_column(registry, table, "Selected column", column, &mut problems);
        }

        for condition in &self.conditions {
            check_column(registry, table, "Condition column", &condition.column, &mut problems);

            match &condition.value {
                Value::Column(dynamic) => {
                    check_column(
                        registry,
                        table,
                        "Compared column",
                        &dynamic.column_name,
                        &mut problems,
                    );
                }
                Value::Text(text) => {
                    if text.contains('\0') {
                        problems.push(format!(
                            "Value for '{}' contains a NUL character",
                            condition.column
                        ));
                    }
                }
                Value::Number(number) => {
                    if let Some(descriptor) = registry.column(table, &condition.column) {
                        if !descriptor.column_type.is_numeric() {
                            problems.push(format!(
                                "Column '{}' has type {} and cannot be compared with the number {}",
                                condition.column,
                                descriptor.column_type.as_str(),
                                number
                            ));
                        }
                    }
                }
            }

            if condition.operator.is_ordering() {
                if let Some(descriptor) = registry.column(table, &condition.column) {
                    if descriptor.column_type == ColumnType::Boolean {
                        problems.push(format!(
                            "Boolean column '{}' only supports = and !=, not {}",
                            condition.column,
                            condition.operator.as_str()
                        ));
                    }
                }
            }
        }

        for column in &self.group_by_columns {
            check_column(registry, table, "Group-by column", column, &mut problems);
        }

        for order_by in &self.order_by_columns {
            check_column(
                registry,
                table,
                "Order-by column",
                &order_by.column_name,
                &mut problems,
            );
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidQueryModel(format!(
                "Query on table '{}' has {} problem(s): {}",
                table,
                problems.len(),
                problems.join("; ")
            )))
        }
    }
}

fn check_column(
    registry: &SchemaRegistry,
    table: Table,
    role: &str,
    column: &str,
    problems: &mut Vec<String>,
) {
    if column.trim().is_empty() {
        problems.push(format!("{} is empty", role));
        return;
    }

    if registry.exists(table, column) {
        return;
    }

    match registry.suggest(table, column) {
        Some(suggestion) => problems.push(format!(
            "{} '{}' does not exist in table '{}'. Did you mean '{}'?",
            role, column, table, suggestion
        )),
        None => problems.push(format!(
            "{} '{}' does not exist in table '{}'",
            role, column, table
        )),
    }
}
