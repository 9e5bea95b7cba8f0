//! The persistence boundary
//!
//! The resource layer never talks to a database directly: controllers hold
//! an injected [`Store`] and issue the small set of primitives the pipeline
//! needs — predicate queries, ordered and paginated fetches, primary-key
//! lookups, writes, relation eager-loads and pivot attach/detach.
//!
//! The crate ships [`InMemoryStore`] as the reference implementation, used
//! for development and tests.

#[cfg(feature = "in-memory")]
pub mod in_memory;

#[cfg(feature = "in-memory")]
pub use in_memory::{ForeignKey, InMemoryStore, OnDelete, TableDef};

use crate::core::filter::FilterSet;
use crate::core::query::{Page, Sort};
use crate::core::resource::Relation;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A stored row: a flat JSON object keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Errors surfaced by storage backends
///
/// These never reach clients directly — the controller boundary maps them
/// to an internal error with a generic message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("row {id} not found in '{table}'")]
    RowNotFound { table: String, id: i64 },

    /// A storage-level unique constraint rejected a write. This is the
    /// backstop for races the check-then-write pipeline cannot close.
    #[error("unique constraint violated on {table}({fields})")]
    UniqueViolation { table: String, fields: String },

    #[error("relation '{0}' is not many-to-many")]
    NotManyToMany(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },
}

/// The query/write primitives the resource layer consumes
#[async_trait]
pub trait Store: Send + Sync {
    /// Filtered, sorted, paginated fetch; returns the page's rows plus the
    /// total filtered row count.
    async fn fetch_page(
        &self,
        table: &str,
        filters: &FilterSet,
        sort: &Sort,
        page: Page,
    ) -> Result<(Vec<Row>, u64), StoreError>;

    /// Filtered, sorted fetch without pagination
    async fn fetch_all(
        &self,
        table: &str,
        filters: &FilterSet,
        sort: &Sort,
    ) -> Result<Vec<Row>, StoreError>;

    /// Primary-key lookup, additionally restricted by `filters`
    async fn fetch_by_id(
        &self,
        table: &str,
        id: i64,
        filters: &FilterSet,
    ) -> Result<Option<Row>, StoreError>;

    /// First row matching all `conditions` simultaneously (used by
    /// uniqueness checks)
    async fn find_where(&self, table: &str, conditions: &Row) -> Result<Option<Row>, StoreError>;

    async fn insert(&self, table: &str, values: Row) -> Result<Row, StoreError>;

    /// Merge `changes` into the identified row
    async fn update(&self, table: &str, id: i64, changes: Row) -> Result<Row, StoreError>;

    /// Delete a row, cascading per the schema's declared cascade rules
    async fn delete(&self, table: &str, id: i64) -> Result<(), StoreError>;

    /// Eager-load a declared relation for one row
    async fn load_relation(&self, row: &Row, relation: &Relation) -> Result<Value, StoreError>;

    /// Record pivot membership for a many-to-many relation
    async fn attach(
        &self,
        relation: &Relation,
        main_id: i64,
        related_id: i64,
    ) -> Result<(), StoreError>;

    /// Remove pivot membership for a many-to-many relation
    async fn detach(
        &self,
        relation: &Relation,
        main_id: i64,
        related_id: i64,
    ) -> Result<(), StoreError>;
}
