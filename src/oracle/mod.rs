//! Reasoning Oracle
//!
//! Black-box boundary that turns a prompt plus the schema into a query model. The
//! retry loop only depends on the `QueryOracle` trait; `LlmOracle` is the
//! chat-completions implementation.

pub mod function_schema;
pub mod prompts;

use crate::error::Result;
use crate::llm::{ChatMessage, LlmClient};
use crate::query::QueryModel;
use crate::schema::SchemaRegistry;
use async_trait::async_trait;
use tracing::info;

use function_schema::{build_sql_query_function, parse_function_call, BUILD_SQL_QUERY};

#[async_trait]
pub trait QueryOracle: Send + Sync {
    /// Propose a query model for `prompt`. Malformed or unparseable output is an
    /// `AgentError::Oracle`.
    async fn propose(&self, prompt: &str, schema: &SchemaRegistry) -> Result<QueryModel>;
}

/// Oracle backed by an OpenAI-compatible chat model with function calling
pub struct LlmOracle {
    llm: LlmClient,
    row_limit: u32,
}

impl LlmOracle {
    pub fn new(llm: LlmClient, row_limit: u32) -> Self {
        Self { llm, row_limit }
    }
}

#[async_trait]
impl QueryOracle for LlmOracle {
    async fn propose(&self, prompt: &str, schema: &SchemaRegistry) -> Result<QueryModel> {
        let messages = vec![
            ChatMessage::system(prompts::system_prompt(schema, self.row_limit)?),
            ChatMessage::user(prompt),
        ];
        let function = build_sql_query_function(schema);

        let function_call = self
            .llm
            .call_llm_with_functions(&messages, &[function], Some(BUILD_SQL_QUERY))
            .await?;

        let model = parse_function_call(&function_call)?;
        info!("SqlQuery from {}: {}", self.llm.model(), model);
        Ok(model)
    }
}
