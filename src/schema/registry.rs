//! Schema Registry
//!
//! Static description of the queryable tables. Loaded once at start-up and shared
//! read-only; it is the single source of truth for what a query model may reference.

use crate::compiler::is_plain_identifier;
use crate::error::{AgentError, Result};
use crate::schema::types::{ColumnDescriptor, Table, TableDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strsim::jaro_winkler;
use tracing::info;

const BUILTIN_SCHEMA: &str = include_str!("../../schema/semantic_model.json");

/// Minimum similarity for a "did you mean" column suggestion
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Serializable view of the registry: `{"tables": {<table>: {...}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub tables: BTreeMap<Table, TableDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    description: SchemaDescription,
}

impl SchemaRegistry {
    /// Registry for the bundled shipments / orders / financial snapshots model
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_SCHEMA)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json_str(&content)?;
        info!(
            "Loaded schema registry from {} ({} tables)",
            path.display(),
            registry.description.tables.len()
        );
        Ok(registry)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let description: SchemaDescription = serde_json::from_str(content)
            .map_err(|e| AgentError::Schema(format!("Failed to parse schema description: {}", e)))?;
        Self::from_description(description)
    }

    pub fn from_description(description: SchemaDescription) -> Result<Self> {
        if description.tables.is_empty() {
            return Err(AgentError::Schema("Schema describes no tables".to_string()));
        }

        for (table, descriptor) in &description.tables {
            if descriptor.columns.is_empty() {
                return Err(AgentError::Schema(format!(
                    "Table '{}' has no columns",
                    table
                )));
            }
            if descriptor.columns.keys().any(|name| name.trim().is_empty()) {
                return Err(AgentError::Schema(format!(
                    "Table '{}' has an empty column name",
                    table
                )));
            }
            // Unquoted identifiers fold to lower case, so only lower-case plain names
            // compile to the same column bare or quoted
            if let Some(name) = descriptor
                .columns
                .keys()
                .find(|name| !is_plain_identifier(name) || name.chars().any(|c| c.is_ascii_uppercase()))
            {
                return Err(AgentError::Schema(format!(
                    "Table '{}' has column '{}', which is not a lower-case plain identifier",
                    table, name
                )));
            }
        }

        Ok(Self { description })
    }

    pub fn description(&self) -> &SchemaDescription {
        &self.description
    }

    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.description.tables.keys().copied()
    }

    pub fn describe(&self, table: Table) -> Option<&TableDescriptor> {
        self.description.tables.get(&table)
    }

    pub fn contains_table(&self, table: Table) -> bool {
        self.description.tables.contains_key(&table)
    }

    pub fn column(&self, table: Table, column: &str) -> Option<&ColumnDescriptor> {
        self.describe(table).and_then(|t| t.columns.get(column))
    }

    pub fn exists(&self, table: Table, column: &str) -> bool {
        self.column(table, column).is_some()
    }

    pub fn columns(&self, table: Table) -> Vec<&str> {
        self.describe(table)
            .map(|t| t.columns.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Closest known column of `table` to a misspelled `column`
    pub fn suggest(&self, table: Table, column: &str) -> Option<&str> {
        let needle = column.to_lowercase();
        self.columns(table)
            .into_iter()
            .map(|candidate| (candidate, jaro_winkler(&needle, &candidate.to_lowercase())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
    }

    /// Pretty JSON of the whole schema, as given to the oracle on every call
    pub fn context_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.description)?)
    }

    /// Pretty JSON of a single table
    pub fn table_context_json(&self, table: Table) -> Result<String> {
        let descriptor = self.describe(table).ok_or_else(|| {
            AgentError::Schema(format!("Table '{}' is not described in the schema", table))
        })?;
        Ok(serde_json::to_string_pretty(descriptor)?)
    }
}
