//! ServerBuilder for fluent API to assemble the HTTP server
//!
//! # Example
//!
//! ```ignore
//! let app = ServerBuilder::new()
//!     .with_store(store)
//!     .register_resource(articles)
//!     .register_resource(tags)
//!     .register_relation(RelationResource::new(
//!         "articles-tags", articles, "article_id", tags, "tag_id", "tags",
//!     ))
//!     .build()?;
//! ```

use crate::config::ServerConfig;
use crate::controller::{RelationController, RelationResource, Serializer};
use crate::core::auth::{AuthProvider, NoAuth};
use crate::core::resource::Resource;
use crate::server::router;
use crate::storage::Store;
use anyhow::{Context, Result, bail};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for creating the router with auto-registered CRUD routes
pub struct ServerBuilder {
    store: Option<Arc<dyn Store>>,
    auth: Arc<dyn AuthProvider>,
    config: ServerConfig,
    resources: Vec<Arc<Resource>>,
    relations: Vec<RelationResource>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            auth: Arc::new(NoAuth),
            config: ServerConfig::default(),
            resources: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the persistence backend (required)
    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the authentication provider (defaults to [`NoAuth`])
    pub fn with_auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a resource: its six CRUD routes are mounted under the API
    /// prefix
    pub fn register_resource(mut self, resource: Arc<Resource>) -> Self {
        self.resources.push(resource);
        self
    }

    /// Register a many-to-many join resource with attach/detach routes
    pub fn register_relation(mut self, relation: RelationResource) -> Self {
        self.relations.push(relation);
        self
    }

    /// Assemble the router
    pub fn build(self) -> Result<Router> {
        let Some(store) = self.store else {
            bail!("a store is required: call with_store() before build()");
        };
        let serializer = Arc::new(Serializer::from_resources(&self.resources));

        let mut api = Router::new();
        for resource in &self.resources {
            api = api.merge(router::resource_routes(
                resource.clone(),
                store.clone(),
                serializer.clone(),
                self.auth.clone(),
            ));
        }
        for relation in self.relations {
            let controller = RelationController::new(relation, store.clone(), serializer.clone());
            api = api.merge(router::relation_routes(controller, self.auth.clone()));
        }

        let app = Router::new()
            .nest(&self.config.api_prefix, api)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            );
        Ok(app)
    }

    /// Build and serve until shutdown
    pub async fn serve(self) -> Result<()> {
        let config = self.config.clone();
        let app = self.build()?;
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
        tracing::info!(host = %config.host, port = config.port, "server running");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
