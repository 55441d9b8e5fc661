//! Stub oracle and executor shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use sqlmend::execution::{ExecutionAdapter, Row};
use sqlmend::oracle::QueryOracle;
use sqlmend::query::QueryModel;
use sqlmend::schema::SchemaRegistry;
use sqlmend::{AgentError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn builtin_registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::builtin().expect("bundled schema parses"))
}

/// Orders table without the tenant column
pub fn registry_without_tenant_column() -> Arc<SchemaRegistry> {
    let json = r#"{
        "tables": {
            "orders": {
                "description": "Orders placed by customers",
                "columns": {
                    "id": {"type": "bigint", "null": false, "description": "Order id"},
                    "status": {"type": "integer", "description": "Order status"}
                }
            }
        }
    }"#;
    Arc::new(SchemaRegistry::from_json_str(json).expect("test schema parses"))
}

/// Orders table with a `name` column, for reserved-word quoting
pub fn registry_with_name_column() -> Arc<SchemaRegistry> {
    let json = r#"{
        "tables": {
            "orders": {
                "description": "Orders placed by customers",
                "columns": {
                    "id": {"type": "bigint", "null": false, "description": "Order id"},
                    "name": {"type": "string", "description": "Customer name"},
                    "status": {"type": "integer", "description": "Order status"},
                    "organization_id": {"type": "bigint", "description": "Owning organization"}
                }
            }
        }
    }"#;
    Arc::new(SchemaRegistry::from_json_str(json).expect("test schema parses"))
}

/// Oracle that replays a fixed script of responses and records every prompt
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<QueryModel>>>,
    prompts: Mutex<Vec<String>>,
    table_counts: Mutex<Vec<usize>>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<QueryModel>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            table_counts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Always answers with `model`
    pub fn always(model: QueryModel, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(model.clone())).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of tables in the schema handed to each call
    pub fn table_counts(&self) -> Vec<usize> {
        self.table_counts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryOracle for ScriptedOracle {
    async fn propose(&self, prompt: &str, schema: &SchemaRegistry) -> Result<QueryModel> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.table_counts.lock().unwrap().push(schema.tables().count());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AgentError::Oracle("script exhausted".to_string())))
    }
}

/// Executor that replays a fixed script of results and records every statement
pub struct ScriptedExecutor {
    results: Mutex<VecDeque<Result<Vec<Row>>>>,
    statements: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<Result<Vec<Row>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str, times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Err(AgentError::Execution(message.to_string())))
                .collect(),
        )
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionAdapter for ScriptedExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.statements.lock().unwrap().push(sql.to_string());
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}
