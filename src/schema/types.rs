//! Schema Types
//!
//! Closed table and column-type sets, and the descriptors the registry hands out.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Queryable relations. Anything outside this set cannot be named by a query model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Shipments,
    Orders,
    FinancialSnapshots,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Shipments, Table::Orders, Table::FinancialSnapshots];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Shipments => "shipments",
            Table::Orders => "orders",
            Table::FinancialSnapshots => "financial_snapshots",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AgentError::Schema(format!(
                    "Unknown table '{}'. Known tables: {}",
                    s,
                    Table::ALL.map(|t| t.as_str()).join(", ")
                ))
            })
    }
}

/// Declared column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Bigint,
    Decimal,
    String,
    Datetime,
    Boolean,
    Tinyint,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Bigint => "bigint",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
            ColumnType::Datetime => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Tinyint => "tinyint",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Bigint | ColumnType::Decimal | ColumnType::Tinyint
        )
    }
}

fn default_nullable() -> bool {
    true
}

/// Column descriptor, owned by the registry and shared read-only.
///
/// Serialized the same way the oracle sees it: `{"type", "null", "precision"?, "description"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(rename = "null", default = "default_nullable")]
    pub nullable: bool,

    /// Fractional-second precision for datetime columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    #[serde(default)]
    pub description: String,
    pub columns: BTreeMap<String, ColumnDescriptor>,
}
