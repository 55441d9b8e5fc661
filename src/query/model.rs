//! Query Model
//!
//! Closed, typed representation of a single query as proposed by the oracle:
//! target table, projection, conjunctive conditions, grouping and ordering.
//! Instances are built once per attempt and never mutated afterwards.

use crate::schema::Table;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators. No other token is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Gt,
        Operator::Lt,
        Operator::Le,
        Operator::Ge,
        Operator::Ne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Ne => "!=",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, Operator::Eq | Operator::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Reference to another column of the same table, substituted unquoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicValue {
    pub column_name: String,
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Column(DynamicValue),
    Number(serde_json::Number),
    Text(String),
}

impl Value {
    pub fn column(name: impl Into<String>) -> Self {
        Value::Column(DynamicValue {
            column_name: name.into(),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByColumn {
    pub column_name: String,
    pub sort_order: SortOrder,
}

/// Aggregate root. An empty `columns` list projects every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub table_name: Table,

    #[serde(default)]
    pub columns: Vec<String>,

    /// Joined with AND, in order
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub group_by_columns: Vec<String>,

    #[serde(default)]
    pub order_by_columns: Vec<OrderByColumn>,
}

impl QueryModel {
    pub fn new(table: Table) -> Self {
        Self {
            table_name: table,
            columns: Vec::new(),
            conditions: Vec::new(),
            group_by_columns: Vec::new(),
            order_by_columns: Vec::new(),
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, sort_order: SortOrder) -> Self {
        self.order_by_columns.push(OrderByColumn {
            column_name: column.into(),
            sort_order,
        });
        self
    }
}

/// Compact JSON, used when a model is echoed back into a prompt
impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
