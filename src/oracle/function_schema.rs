//! Function Schema
//!
//! JSON schema of the `build_sql_query` function. Tables and operators are listed as
//! enums so the model is steered toward the closed sets the query model accepts.

use crate::error::{AgentError, Result};
use crate::llm::{FunctionCall, FunctionDefinition};
use crate::query::{Operator, QueryModel};
use crate::schema::SchemaRegistry;
use serde_json::json;

pub const BUILD_SQL_QUERY: &str = "build_sql_query";

pub fn build_sql_query_function(registry: &SchemaRegistry) -> FunctionDefinition {
    let tables: Vec<&str> = registry.tables().map(|t| t.as_str()).collect();
    let operators: Vec<&str> = Operator::ALL.iter().map(|o| o.as_str()).collect();

    FunctionDefinition {
        name: BUILD_SQL_QUERY.to_string(),
        description: "Describe a single-table SQL query that answers the question. \
                      Conditions are combined with AND."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "enum": tables,
                    "description": "The name of the table to query."
                },
                "columns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "The columns to include in the SELECT clause. Empty selects every column."
                },
                "conditions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "column": { "type": "string" },
                            "operator": { "type": "string", "enum": operators },
                            "value": {
                                "anyOf": [
                                    { "type": "string" },
                                    { "type": "number" },
                                    {
                                        "type": "object",
                                        "properties": { "column_name": { "type": "string" } },
                                        "required": ["column_name"]
                                    }
                                ],
                                "description": "A string, a number, or {\"column_name\": ...} to compare against another column."
                            }
                        },
                        "required": ["column", "operator", "value"]
                    },
                    "description": "The conditions to include in the WHERE clause."
                },
                "group_by_columns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "The columns to group by in the query."
                },
                "order_by_columns": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "column_name": { "type": "string" },
                            "sort_order": { "type": "string", "enum": ["ASC", "DESC"] }
                        },
                        "required": ["column_name", "sort_order"]
                    },
                    "description": "The columns to order by, including the sort order."
                }
            },
            "required": ["table_name", "columns", "conditions", "group_by_columns", "order_by_columns"]
        }),
    }
}

/// Parse function call arguments into a QueryModel
pub fn parse_function_call(function_call: &FunctionCall) -> Result<QueryModel> {
    if function_call.name != BUILD_SQL_QUERY {
        return Err(AgentError::Oracle(format!(
            "Unexpected function '{}', expected '{}'",
            function_call.name, BUILD_SQL_QUERY
        )));
    }

    serde_json::from_str(&function_call.arguments).map_err(|e| {
        AgentError::Oracle(format!(
            "Failed to parse function call arguments: {}. Arguments: {}",
            e, function_call.arguments
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    #[test]
    fn test_schema_enumerates_tables_and_operators() {
        let registry = SchemaRegistry::builtin().unwrap();
        let function = build_sql_query_function(&registry);
        let tables = &function.parameters["properties"]["table_name"]["enum"];
        assert_eq!(tables.as_array().unwrap().len(), 3);

        let operators = &function.parameters["properties"]["conditions"]["items"]["properties"]
            ["operator"]["enum"];
        assert_eq!(operators.as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_parse_function_call() {
        let call = FunctionCall {
            name: BUILD_SQL_QUERY.to_string(),
            arguments: r#"{"table_name": "financial_snapshots", "columns": ["cash_balance"], "conditions": [], "group_by_columns": [], "order_by_columns": []}"#.to_string(),
        };
        let model = parse_function_call(&call).unwrap();
        assert_eq!(model.table_name, Table::FinancialSnapshots);
        assert_eq!(model.columns, vec!["cash_balance".to_string()]);
    }

    #[test]
    fn test_malformed_arguments_are_oracle_errors() {
        let call = FunctionCall {
            name: BUILD_SQL_QUERY.to_string(),
            arguments: r#"{"table_name": "orders", "conditions": [{"column": "id"#.to_string(),
        };
        assert!(matches!(parse_function_call(&call), Err(AgentError::Oracle(_))));

        let call = FunctionCall {
            name: "run_sql".to_string(),
            arguments: "{}".to_string(),
        };
        assert!(matches!(parse_function_call(&call), Err(AgentError::Oracle(_))));
    }
}
