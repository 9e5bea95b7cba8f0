//! Request validation
//!
//! Declarative per-resource, per-action schemas with dynamic rewriting of
//! the `filters` and `sort` sub-schemas based on declared field types.

pub mod filters;
pub mod request;
pub mod schema;

pub use filters::{check_filter_value, filter_value_schema, validate_filters};
pub use request::{Action, ActionSchema, ActionSchemas, RequestParts, ValidatedRequest};
pub use schema::{ObjectSchema, QuerySchema, ValidatedQuery};
