//! Query model → SQL text compilation.

pub mod sql;

pub use sql::{
    is_plain_identifier, quote_identifier, quote_literal, SqlCompiler, TenantScope, DEFAULT_ROW_LIMIT,
};
