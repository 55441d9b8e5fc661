//! Structured query model proposed by the oracle, and its validation.

pub mod model;
pub mod validate;

pub use model::{Condition, DynamicValue, Operator, OrderByColumn, QueryModel, SortOrder, Value};
