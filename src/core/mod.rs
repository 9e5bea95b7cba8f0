//! Core abstractions of the resource layer

pub mod auth;
pub mod error;
pub mod field;
pub mod filter;
pub mod query;
pub mod resource;
pub mod validation;

pub use error::{RestError, RestResult};
pub use field::{FieldSchema, FieldType};
pub use filter::{Filter, FilterSet, Operator};
pub use query::{Page, Pagination, Sort};
pub use resource::{RequestContext, Resource};
