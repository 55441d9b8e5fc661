//! SQL Compiler - Deterministic SQL text from a validated query model
//!
//! Clause order is fixed:
//! `SELECT <columns|*> FROM <table> [WHERE ..] [GROUP BY ..] [ORDER BY ..] LIMIT <n>`.
//! The model is validated against the schema registry first, so every identifier that
//! reaches the output is a known column name. Literals are escaped; column-reference
//! values are the only unquoted substitution and are restricted to known columns.

use crate::error::{AgentError, Result};
use crate::query::{Condition, OrderByColumn, QueryModel, Value};
use crate::schema::SchemaRegistry;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Row cap appended to every query
pub const DEFAULT_ROW_LIMIT: u32 = 10;

/// Identifiers that collide with keywords of the target dialect
const RESERVED_IDENTIFIERS: &[&str] = &["name"];

lazy_static! {
    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Row-level tenant restriction appended to the WHERE clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    column: String,
    tenant_id: i64,
}

impl TenantScope {
    pub fn new(column: impl Into<String>, tenant_id: i64) -> Result<Self> {
        let column = column.into();
        if !is_plain_identifier(&column) {
            return Err(AgentError::Config(format!(
                "Tenant column '{}' is not a plain identifier",
                column
            )));
        }
        Ok(Self { column, tenant_id })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn tenant_id(&self) -> i64 {
        self.tenant_id
    }

    fn predicate(&self) -> String {
        format!("{} = {}", quote_identifier(&self.column), self.tenant_id)
    }
}

#[derive(Debug, Clone)]
pub struct SqlCompiler {
    registry: Arc<SchemaRegistry>,
    row_limit: u32,
    tenant: Option<TenantScope>,
}

impl SqlCompiler {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            row_limit: DEFAULT_ROW_LIMIT,
            tenant: None,
        }
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit.max(1);
        self
    }

    pub fn with_tenant(mut self, tenant: TenantScope) -> Self {
        self.tenant = Some(tenant);
        self
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    pub fn tenant(&self) -> Option<&TenantScope> {
        self.tenant.as_ref()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Compile a model to SQL text. Fails with `InvalidQueryModel` without emitting
    /// anything if the model does not conform to the registry, and with `Schema` if
    /// the tenant column is missing from the queried table.
    pub fn compile(&self, model: &QueryModel) -> Result<String> {
        model.validate(&self.registry)?;

        // Schema problem, not something the oracle can correct
        if let Some(tenant) = &self.tenant {
            if !self.registry.exists(model.table_name, tenant.column()) {
                return Err(AgentError::Schema(format!(
                    "Tenant column '{}' is not a column of table '{}'",
                    tenant.column(),
                    model.table_name
                )));
            }
        }

        let projection = if model.columns.is_empty() {
            "*".to_string()
        } else {
            model.columns.iter().map(|c| quote_identifier(c)).join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", projection, model.table_name.as_str());

        let mut predicates: Vec<String> = model.conditions.iter().map(render_condition).collect();
        if let Some(tenant) = &self.tenant {
            predicates.push(tenant.predicate());
        }
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !model.group_by_columns.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(
                &model
                    .group_by_columns
                    .iter()
                    .map(|c| quote_identifier(c))
                    .join(", "),
            );
        }

        if !model.order_by_columns.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&model.order_by_columns.iter().map(render_order_by).join(", "));
        }

        sql.push_str(&format!(" LIMIT {}", self.row_limit));

        debug!("Compiled query model for '{}': {}", model.table_name, sql);
        Ok(sql)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(identifier: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(identifier)
}

/// Double-quote identifiers that collide with reserved words, emit the rest bare
pub fn quote_identifier(identifier: &str) -> String {
    let reserved = RESERVED_IDENTIFIERS
        .iter()
        .any(|word| identifier.eq_ignore_ascii_case(word));

    if reserved {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    } else {
        identifier.to_string()
    }
}

/// Single-quoted string literal with embedded quotes doubled
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Column(dynamic) => quote_identifier(&dynamic.column_name),
        Value::Number(number) => number.to_string(),
        Value::Text(text) => quote_literal(text),
    }
}

fn render_condition(condition: &Condition) -> String {
    format!(
        "{} {} {}",
        quote_identifier(&condition.column),
        condition.operator.as_str(),
        render_value(&condition.value)
    )
}

fn render_order_by(order_by: &OrderByColumn) -> String {
    format!(
        "{} {}",
        quote_identifier(&order_by.column_name),
        order_by.sort_order.as_str()
    )
}
