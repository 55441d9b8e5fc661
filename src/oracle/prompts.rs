//! Oracle Prompts
//!
//! System prompt for the query-building model. The schema context is attached on
//! every call, not only the first, so corrections are made against the real schema.

use crate::error::Result;
use crate::schema::SchemaRegistry;

pub const AGENT_DESCRIPTION: &str =
    "You are a PostgreSQL agent. Your task is to answer questions by describing a single SQL query \
     with the build_sql_query function.";

const INSTRUCTIONS: &[&str] = &[
    "1. Analyze the question and the expected answer:",
    "   - From the question and the expected answer, identify the table and the columns that need to be queried.",
    "   - Use only the tables and columns listed in the semantic model.",
    "2. Build the query with the build_sql_query function:",
    "   - The query must be valid PostgreSQL once compiled.",
    "   - Add the conditions the question implies to the WHERE clause, for example:",
    "       - date ranges with both a lower and an upper bound;",
    "       - excluding past records when the question is about future dates.",
    "   - Conditions are combined with AND. OR and nested conditions are not available.",
    "   - To compare two columns, pass {\"column_name\": <other column>} as the value.",
    "",
    "General guidelines:",
    "   - Query boolean columns with TRUE or FALSE, never with 1 or 0.",
    "   - Compare numeric columns with numbers and text or datetime columns with strings.",
    "   - Never invent column names; a column that is not in the semantic model makes the query fail.",
    "   - Leave the column list empty to select every column.",
];

/// Full system message: role, instructions and the schema context
pub fn system_prompt(registry: &SchemaRegistry, row_limit: u32) -> Result<String> {
    let mut parts = Vec::new();

    parts.push(AGENT_DESCRIPTION.to_string());
    parts.push(String::new());
    parts.push("## Instructions".to_string());
    parts.extend(INSTRUCTIONS.iter().map(|line| line.to_string()));
    parts.push(format!(
        "   - At most {} rows are returned, so order the results when the question asks for top or latest records.",
        row_limit
    ));
    parts.push(String::new());
    parts.push("Here are the tables available:".to_string());
    parts.push("<semantic_model>".to_string());
    parts.push(registry.context_json()?);
    parts.push("</semantic_model>".to_string());

    Ok(parts.join("\n"))
}
