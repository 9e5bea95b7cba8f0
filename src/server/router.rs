//! Route building for resources and join resources
//!
//! Every resource gets the same six routes:
//! - `GET    /{resources}`       → index
//! - `GET    /{resources}/all`   → all
//! - `GET    /{resources}/{id}`  → show
//! - `POST   /{resources}`       → create
//! - `PUT    /{resources}/{id}`  → update
//! - `DELETE /{resources}/{id}`  → destroy
//!
//! Join resources get attach/detach on their own path:
//! - `POST   /{a}-{b}` → attach
//! - `DELETE /{a}-{b}` → detach

use crate::controller::resource::{ItemResponse, ListResponse, PageResponse};
use crate::controller::{RelationController, ResourceController, Serializer};
use crate::core::auth::AuthProvider;
use crate::core::error::RestResult;
use crate::core::resource::{RequestContext, Resource};
use crate::core::validation::request::{Action, RequestParts, validate_request};
use crate::server::querystring;
use crate::storage::Store;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceState {
    pub controller: Arc<ResourceController>,
    pub auth: Arc<dyn AuthProvider>,
}

#[derive(Clone)]
pub struct RelationState {
    pub controller: Arc<RelationController>,
    pub auth: Arc<dyn AuthProvider>,
}

/// Build the six CRUD routes for one resource
pub fn resource_routes(
    resource: Arc<Resource>,
    store: Arc<dyn Store>,
    serializer: Arc<Serializer>,
    auth: Arc<dyn AuthProvider>,
) -> Router {
    let base = format!("/{}", resource.table().replace('_', "-"));
    let state = ResourceState {
        controller: Arc::new(ResourceController::new(resource, store, serializer)),
        auth,
    };
    Router::new()
        .route(&base, get(index).post(create))
        .route(&format!("{base}/all"), get(all))
        .route(
            &format!("{base}/{{id}}"),
            get(show).put(update).delete(destroy),
        )
        .with_state(state)
}

/// Build the attach/detach routes for one join resource
pub fn relation_routes(
    controller: RelationController,
    auth: Arc<dyn AuthProvider>,
) -> Router {
    let path = format!("/{}", controller.definition().path);
    let state = RelationState {
        controller: Arc::new(controller),
        auth,
    };
    Router::new()
        .route(&path, post(attach).delete(detach))
        .with_state(state)
}

async fn context(
    auth: &Arc<dyn AuthProvider>,
    headers: &HeaderMap,
) -> RestResult<RequestContext> {
    Ok(RequestContext {
        principal: auth.authenticate(headers).await?,
    })
}

fn list_parts(raw: Option<String>) -> RequestParts {
    RequestParts {
        params: Map::new(),
        query: querystring::parse(raw.as_deref().unwrap_or_default()),
        body: Value::Null,
    }
}

fn id_parts(id: String, raw: Option<String>, body: Value) -> RequestParts {
    RequestParts {
        params: [("id".to_string(), Value::String(id))].into_iter().collect(),
        query: querystring::parse(raw.as_deref().unwrap_or_default()),
        body,
    }
}

fn body_value(body: Result<Json<Value>, JsonRejection>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

// === Resource handlers ===

async fn index(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> RestResult<Json<PageResponse>> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let req = validate_request(schemas.get(Action::Index), &list_parts(raw))?;
    Ok(Json(state.controller.index(&ctx, &req).await?))
}

async fn all(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> RestResult<Json<ListResponse>> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let req = validate_request(schemas.get(Action::All), &list_parts(raw))?;
    Ok(Json(state.controller.all(&ctx, &req).await?))
}

async fn show(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    RawQuery(raw): RawQuery,
) -> RestResult<Json<ItemResponse>> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let req = validate_request(schemas.get(Action::Show), &id_parts(id, raw, Value::Null))?;
    Ok(Json(state.controller.show(&ctx, &req).await?))
}

async fn create(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<(StatusCode, Json<ItemResponse>)> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let parts = RequestParts {
        params: Map::new(),
        query: Value::Null,
        body: body_value(body),
    };
    let req = validate_request(schemas.get(Action::Create), &parts)?;
    let response = state.controller.create(&ctx, &req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Json<ItemResponse>> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let req = validate_request(
        schemas.get(Action::Update),
        &id_parts(id, None, body_value(body)),
    )?;
    Ok(Json(state.controller.update(&ctx, &req).await?))
}

async fn destroy(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> RestResult<StatusCode> {
    let ctx = context(&state.auth, &headers).await?;
    let schemas = state.controller.resource().schemas();
    let req = validate_request(schemas.get(Action::Destroy), &id_parts(id, None, Value::Null))?;
    state.controller.destroy(&ctx, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Relation handlers ===

async fn attach(
    State(state): State<RelationState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<(StatusCode, Json<ItemResponse>)> {
    context(&state.auth, &headers).await?;
    let schemas = &state.controller.definition().schemas;
    let parts = RequestParts {
        params: Map::new(),
        query: Value::Null,
        body: body_value(body),
    };
    let req = validate_request(schemas.get(Action::Create), &parts)?;
    let response = state.controller.create(&req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn detach(
    State(state): State<RelationState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Json<ItemResponse>> {
    context(&state.auth, &headers).await?;
    let schemas = &state.controller.definition().schemas;
    let parts = RequestParts {
        params: Map::new(),
        query: Value::Null,
        body: body_value(body),
    };
    let req = validate_request(schemas.get(Action::Destroy), &parts)?;
    Ok(Json(state.controller.destroy(&req).await?))
}
