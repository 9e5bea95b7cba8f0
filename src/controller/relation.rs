//! The generic relation controller
//!
//! Manages a many-to-many join for a `(main, relation)` resource pair.
//! Attach and detach are idempotent set-membership toggles: attaching an
//! already-present pair or detaching an absent pair is a success that
//! returns the current state, never an error. Only referencing a
//! nonexistent entity fails.

use crate::controller::Serializer;
use crate::controller::resource::ItemResponse;
use crate::core::error::{RestError, RestResult};
use crate::core::field::FieldSchema;
use crate::core::filter::FilterSet;
use crate::core::resource::{Relation, Resource};
use crate::core::validation::request::{ActionSchemas, ValidatedRequest};
use crate::core::validation::schema::ObjectSchema;
use crate::storage::{Row, Store};
use serde_json::Value;
use std::sync::Arc;

/// Configuration of one join resource: the two ends, the body fields naming
/// their ids, and the relation on the main resource that the pivot feeds.
pub struct RelationResource {
    /// Route path segment (e.g. "articles-tags")
    pub path: &'static str,
    pub main: Arc<Resource>,
    pub main_field: &'static str,
    pub related: Arc<Resource>,
    pub related_field: &'static str,
    /// Relation name on the main resource (must be many-to-many)
    pub relationship: &'static str,
    pub schemas: ActionSchemas,
}

impl RelationResource {
    pub fn new(
        path: &'static str,
        main: Arc<Resource>,
        main_field: &'static str,
        related: Arc<Resource>,
        related_field: &'static str,
        relationship: &'static str,
    ) -> Self {
        let body = ObjectSchema::new()
            .field(
                main_field,
                FieldSchema::number().integer().positive().required(),
            )
            .field(
                related_field,
                FieldSchema::number().integer().positive().required(),
            );
        let schemas = ActionSchemas::relation(body.clone(), body);
        Self {
            path,
            main,
            main_field,
            related,
            related_field,
            relationship,
            schemas,
        }
    }
}

/// One controller instance serves one join resource
pub struct RelationController {
    def: RelationResource,
    store: Arc<dyn Store>,
    serializer: Arc<Serializer>,
}

impl RelationController {
    pub fn new(def: RelationResource, store: Arc<dyn Store>, serializer: Arc<Serializer>) -> Self {
        Self {
            def,
            store,
            serializer,
        }
    }

    pub fn definition(&self) -> &RelationResource {
        &self.def
    }

    /// Attach: both entities must exist; an already-attached pair is
    /// returned as-is.
    pub async fn create(&self, req: &ValidatedRequest) -> RestResult<ItemResponse> {
        let (main_id, related_id) = self.ids(req)?;
        let relation = self.relation()?;
        let (mut row, members) = self.resolve(main_id, related_id, relation).await?;

        let attached = members
            .iter()
            .any(|member| member.get("id").and_then(Value::as_i64) == Some(related_id));
        if attached {
            row.insert(relation.name.to_string(), Value::Array(members));
        } else {
            self.store.attach(relation, main_id, related_id).await?;
            row = self.refetch(main_id, relation).await?;
        }

        Ok(ItemResponse {
            data: self.serializer.present(&self.def.main, row),
        })
    }

    /// Detach: both entities must exist; an absent pair is returned as-is.
    pub async fn destroy(&self, req: &ValidatedRequest) -> RestResult<ItemResponse> {
        let (main_id, related_id) = self.ids(req)?;
        let relation = self.relation()?;
        let (mut row, members) = self.resolve(main_id, related_id, relation).await?;

        let attached = members
            .iter()
            .any(|member| member.get("id").and_then(Value::as_i64) == Some(related_id));
        if attached {
            self.store.detach(relation, main_id, related_id).await?;
            row = self.refetch(main_id, relation).await?;
        } else {
            row.insert(relation.name.to_string(), Value::Array(members));
        }

        Ok(ItemResponse {
            data: self.serializer.present(&self.def.main, row),
        })
    }

    fn ids(&self, req: &ValidatedRequest) -> RestResult<(i64, i64)> {
        let main_id = body_id(&req.body, self.def.main_field)?;
        let related_id = body_id(&req.body, self.def.related_field)?;
        Ok((main_id, related_id))
    }

    fn relation(&self) -> RestResult<&Relation> {
        self.def.main.relation(self.def.relationship).ok_or_else(|| {
            RestError::Internal(format!(
                "relation '{}' is not declared on resource '{}'",
                self.def.relationship,
                self.def.main.name()
            ))
        })
    }

    /// Fetch both ends, erroring with the constraint message for whichever
    /// is missing, and return the main row plus its current membership.
    async fn resolve(
        &self,
        main_id: i64,
        related_id: i64,
        relation: &Relation,
    ) -> RestResult<(Row, Vec<Value>)> {
        let row = self
            .store
            .fetch_by_id(self.def.main.table(), main_id, &FilterSet::new())
            .await?
            .ok_or_else(|| missing(self.def.main.name(), main_id))?;
        self.store
            .fetch_by_id(self.def.related.table(), related_id, &FilterSet::new())
            .await?
            .ok_or_else(|| missing(self.def.related.name(), related_id))?;

        let members = self
            .store
            .load_relation(&row, relation)
            .await?
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok((row, members))
    }

    async fn refetch(&self, main_id: i64, relation: &Relation) -> RestResult<Row> {
        let mut row = self
            .store
            .fetch_by_id(self.def.main.table(), main_id, &FilterSet::new())
            .await?
            .ok_or_else(|| {
                RestError::Internal(format!(
                    "{} {} vanished between attach and refetch",
                    self.def.main.name(),
                    main_id
                ))
            })?;
        let members = self.store.load_relation(&row, relation).await?;
        row.insert(relation.name.to_string(), members);
        Ok(row)
    }
}

fn body_id(body: &Row, field: &str) -> RestResult<i64> {
    body.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| RestError::Validation(format!("\"{}\" must be a number", field)))
}

fn missing(resource: &str, id: i64) -> RestError {
    RestError::BadRequest(format!("{} model with id {} must be exists", resource, id))
}
