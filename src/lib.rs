//! # Resourceful
//!
//! A generic REST resource layer for building CRUD APIs over relational
//! models in Rust.
//!
//! ## Features
//!
//! - **Uniform CRUD Actions**: index/all/show/create/update/destroy implemented
//!   once, parameterized by immutable resource descriptors
//! - **Declarative Filtering**: `filters[field__operator]=value` query grammar
//!   with a fixed, closed operator vocabulary
//! - **Schema Validation**: per-resource, per-action request schemas with
//!   dynamic filter/sort rewriting based on declared field types
//! - **Constraint Checks**: generic existence (foreign key) and uniqueness
//!   (single or composite) checks applied before every write
//! - **Relation Includes**: eager-loading of declared relations
//! - **Idempotent Attach/Detach**: many-to-many join management that never
//!   errors on "already attached" / "already detached"
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resourceful::prelude::*;
//!
//! let tags = Resource::builder("Tag", "tags")
//!     .field("id", FieldSchema::number())
//!     .field("name", FieldSchema::string())
//!     .sortable(&["id", "name"])
//!     .create_body(
//!         ObjectSchema::new().field("name", FieldSchema::string().max_length(100).required()),
//!     )
//!     .build();
//!
//! let store = InMemoryStore::builder().table(TableDef::new("tags")).build();
//!
//! let app = ServerBuilder::new()
//!     .with_store(store)
//!     .register_resource(tags)
//!     .build()?;
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Types ===
    pub use crate::core::{
        auth::{AuthProvider, NoAuth, Principal},
        error::{RestError, RestResult},
        field::{FieldSchema, FieldType},
        filter::{Filter, FilterSet, Operator},
        query::{Page, Pagination, Sort},
        resource::{
            ExistenceConstraint, Relation, RelationKind, RequestContext, Resource,
            UniquenessConstraint,
        },
    };

    // === Validation ===
    pub use crate::core::validation::{
        request::{Action, ActionSchema, ActionSchemas, RequestParts, ValidatedRequest},
        schema::{ObjectSchema, QuerySchema, ValidatedQuery},
    };

    // === Controllers ===
    pub use crate::controller::{
        relation::{RelationController, RelationResource},
        resource::ResourceController,
    };

    // === Storage ===
    pub use crate::storage::{Row, Store, StoreError};
    #[cfg(feature = "in-memory")]
    pub use crate::storage::{ForeignKey, InMemoryStore, OnDelete, TableDef};

    // === Config ===
    pub use crate::config::ServerConfig;

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        http::HeaderMap,
        routing::{delete, get, post, put},
    };
}
