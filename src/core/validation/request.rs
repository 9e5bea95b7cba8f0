//! Per-action request validation
//!
//! Each resource action owns an optional [`ActionSchema`] covering the
//! three request parts (params, query, body). Actions without a declared
//! schema skip validation entirely and pass the raw request through.

use crate::core::error::{RestError, RestResult};
use crate::core::field::FieldSchema;
use crate::core::validation::schema::{ObjectSchema, QuerySchema, ValidatedQuery};
use serde_json::{Map, Value};

/// The six uniform resource actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Index,
    All,
    Show,
    Create,
    Update,
    Destroy,
}

/// Declarative schema for one action's request parts
#[derive(Debug, Clone, Default)]
pub struct ActionSchema {
    pub params: Option<ObjectSchema>,
    pub query: Option<QuerySchema>,
    pub body: Option<ObjectSchema>,
}

/// The per-action schema table of a resource
#[derive(Debug, Clone, Default)]
pub struct ActionSchemas {
    pub index: Option<ActionSchema>,
    pub all: Option<ActionSchema>,
    pub show: Option<ActionSchema>,
    pub create: Option<ActionSchema>,
    pub update: Option<ActionSchema>,
    pub destroy: Option<ActionSchema>,
}

fn id_params() -> ObjectSchema {
    ObjectSchema::new().field("id", FieldSchema::number().integer().positive().required())
}

impl ActionSchemas {
    /// The standard table every resource gets: list shapes for index/all,
    /// id params for show/update/destroy, and the provided body schemas for
    /// the write actions (absent body schema ⇒ the action passes through).
    pub fn standard(
        list_query: QuerySchema,
        show_query: QuerySchema,
        create_body: Option<ObjectSchema>,
        update_body: Option<ObjectSchema>,
    ) -> Self {
        Self {
            index: Some(ActionSchema {
                params: None,
                query: Some(list_query.clone().paginated()),
                body: None,
            }),
            all: Some(ActionSchema {
                params: None,
                query: Some(list_query),
                body: None,
            }),
            show: Some(ActionSchema {
                params: Some(id_params()),
                query: Some(show_query),
                body: None,
            }),
            create: create_body.map(|body| ActionSchema {
                params: None,
                query: None,
                body: Some(body),
            }),
            update: update_body.map(|body| ActionSchema {
                params: Some(id_params()),
                query: None,
                body: Some(body),
            }),
            destroy: Some(ActionSchema {
                params: Some(id_params()),
                query: None,
                body: None,
            }),
        }
    }

    /// Schema table for a join resource: only attach (create) and detach
    /// (destroy), both body-driven.
    pub fn relation(create_body: ObjectSchema, destroy_body: ObjectSchema) -> Self {
        Self {
            create: Some(ActionSchema {
                params: None,
                query: None,
                body: Some(create_body),
            }),
            destroy: Some(ActionSchema {
                params: None,
                query: None,
                body: Some(destroy_body),
            }),
            ..Self::default()
        }
    }

    pub fn get(&self, action: Action) -> Option<&ActionSchema> {
        match action {
            Action::Index => self.index.as_ref(),
            Action::All => self.all.as_ref(),
            Action::Show => self.show.as_ref(),
            Action::Create => self.create.as_ref(),
            Action::Update => self.update.as_ref(),
            Action::Destroy => self.destroy.as_ref(),
        }
    }
}

/// The raw request parts handed to validation
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub params: Map<String, Value>,
    pub query: Value,
    pub body: Value,
}

/// The validated, normalized request a controller action receives
#[derive(Debug, Clone, Default)]
pub struct ValidatedRequest {
    pub params: Map<String, Value>,
    pub query: ValidatedQuery,
    pub body: Map<String, Value>,
}

impl ValidatedRequest {
    /// The validated `id` path parameter.
    ///
    /// Accepts raw numeric strings so pass-through actions (no declared
    /// schema) still resolve their primary key.
    pub fn id(&self) -> RestResult<i64> {
        let raw = self.params.get("id").unwrap_or(&Value::Null);
        match raw {
            Value::Number(n) => n.as_i64().ok_or_else(invalid_id),
            Value::String(s) => s.parse::<i64>().map_err(|_| invalid_id()),
            _ => Err(invalid_id()),
        }
    }
}

fn invalid_id() -> RestError {
    RestError::Validation("\"id\" must be a number".to_string())
}

/// Validate the raw parts against an action's schema.
///
/// A missing schema skips validation: params and body pass through
/// untouched and the query normalizes to its defaults. Validation works on
/// the raw values by reference; a failure leaves the request exactly as it
/// arrived.
pub fn validate_request(
    schema: Option<&ActionSchema>,
    parts: &RequestParts,
) -> RestResult<ValidatedRequest> {
    let Some(schema) = schema else {
        return Ok(ValidatedRequest {
            params: parts.params.clone(),
            query: ValidatedQuery::default(),
            body: parts.body.as_object().cloned().unwrap_or_default(),
        });
    };

    let params = match &schema.params {
        Some(object) => object
            .validate(&Value::Object(parts.params.clone()))
            .map_err(RestError::Validation)?,
        None => parts.params.clone(),
    };

    let query = match &schema.query {
        Some(query_schema) => query_schema
            .validate(&parts.query)
            .map_err(RestError::Validation)?,
        None => ValidatedQuery::default(),
    };

    let body = match &schema.body {
        Some(object) => object.validate(&parts.body).map_err(RestError::Validation)?,
        None => parts.body.as_object().cloned().unwrap_or_default(),
    };

    Ok(ValidatedRequest {
        params,
        query,
        body,
    })
}
