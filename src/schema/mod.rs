//! Schema registry: the tables and columns a query model may reference.

pub mod registry;
pub mod types;

pub use registry::{SchemaDescription, SchemaRegistry};
pub use types::{ColumnDescriptor, ColumnType, Table, TableDescriptor};
