//! Resource descriptors
//!
//! A [`Resource`] is the per-resource configuration consumed by the shared
//! controller implementation: the underlying table, the declared field
//! schemas (which double as the filterable set), sortable fields, relations,
//! constraint lists and per-action request schemas. Descriptors are built
//! once at startup and never mutated; the controllers hold them behind
//! `Arc` and stay completely generic.

use crate::core::auth::Principal;
use crate::core::field::FieldSchema;
use crate::core::filter::FilterSet;
use crate::core::validation::request::ActionSchemas;
use crate::core::validation::schema::{ObjectSchema, QuerySchema};
use indexmap::IndexMap;
use std::sync::Arc;

/// A foreign-key field that must reference an existing row
#[derive(Debug, Clone)]
pub struct ExistenceConstraint {
    /// Model name used in error messages (e.g. "User")
    pub resource: &'static str,
    /// Table holding the referenced rows
    pub table: &'static str,
    /// The foreign-key field on the submitted body
    pub field: &'static str,
}

/// A field or field-group that must be unique among a resource's rows
#[derive(Debug, Clone)]
pub struct UniquenessConstraint {
    pub fields: Vec<&'static str>,
}

impl UniquenessConstraint {
    pub fn single(field: &'static str) -> Self {
        Self {
            fields: vec![field],
        }
    }

    pub fn composite(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }

    /// The conflict message: `X field must be unique`, or for groups
    /// `X, Y and Z fields must be unique`
    pub fn message(&self) -> String {
        let names = if self.fields.len() > 1 {
            let head = self.fields[..self.fields.len() - 1].join(", ");
            format!("{} and {}", head, self.fields[self.fields.len() - 1])
        } else {
            self.fields[0].to_string()
        };
        let plural = if self.fields.len() > 1 { "s" } else { "" };
        format!("{} field{} must be unique", names, plural)
    }
}

/// How a relation connects two tables
#[derive(Debug, Clone)]
pub enum RelationKind {
    /// Foreign key on this table referencing the target's id
    BelongsTo { foreign_key: &'static str },
    /// Foreign key on the target table referencing this id, at most one row
    HasOne { foreign_key: &'static str },
    /// Foreign key on the target table referencing this id
    HasMany { foreign_key: &'static str },
    /// Pivot table holding `(foreign_key → this id, other_key → target id)`
    BelongsToMany {
        pivot_table: &'static str,
        foreign_key: &'static str,
        other_key: &'static str,
    },
}

/// A named, eager-loadable relation
#[derive(Debug, Clone)]
pub struct Relation {
    /// Include name requested via `includes[]`
    pub name: &'static str,
    /// Target table
    pub table: &'static str,
    pub kind: RelationKind,
}

impl Relation {
    pub fn belongs_to(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::BelongsTo { foreign_key },
        }
    }

    pub fn has_one(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::HasOne { foreign_key },
        }
    }

    pub fn has_many(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::HasMany { foreign_key },
        }
    }

    pub fn belongs_to_many(
        name: &'static str,
        table: &'static str,
        pivot_table: &'static str,
        foreign_key: &'static str,
        other_key: &'static str,
    ) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::BelongsToMany {
                pivot_table,
                foreign_key,
                other_key,
            },
        }
    }
}

/// Per-request context handed to pre-filter hooks
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
}

/// A resource-specific, always-applied query restriction
pub type PreFilter = Arc<dyn Fn(&RequestContext) -> FilterSet + Send + Sync>;

/// Immutable per-resource configuration
pub struct Resource {
    name: &'static str,
    table: &'static str,
    fields: IndexMap<&'static str, FieldSchema>,
    sortable: Vec<&'static str>,
    relations: Vec<Relation>,
    hidden: Vec<&'static str>,
    must_exist: Vec<ExistenceConstraint>,
    must_be_unique: Vec<UniquenessConstraint>,
    schemas: ActionSchemas,
    pre_filter: Option<PreFilter>,
}

impl Resource {
    pub fn builder(name: &'static str, table: &'static str) -> ResourceBuilder {
        ResourceBuilder {
            name,
            table,
            fields: IndexMap::new(),
            sortable: Vec::new(),
            relations: Vec::new(),
            hidden: Vec::new(),
            must_exist: Vec::new(),
            must_be_unique: Vec::new(),
            create_body: None,
            update_body: None,
            pre_filter: None,
        }
    }

    /// Model name used in error messages (e.g. "Article")
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Declared field schemas; the key set is the filterable set
    pub fn fields(&self) -> &IndexMap<&'static str, FieldSchema> {
        &self.fields
    }

    pub fn sortable(&self) -> &[&'static str] {
        &self.sortable
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Fields stripped from every serialized row
    pub fn hidden(&self) -> &[&'static str] {
        &self.hidden
    }

    pub fn existence_constraints(&self) -> &[ExistenceConstraint] {
        &self.must_exist
    }

    pub fn uniqueness_constraints(&self) -> &[UniquenessConstraint] {
        &self.must_be_unique
    }

    pub fn schemas(&self) -> &ActionSchemas {
        &self.schemas
    }

    /// The always-applied query restriction for this resource, if any
    pub fn pre_filter(&self, ctx: &RequestContext) -> FilterSet {
        match &self.pre_filter {
            Some(hook) => hook(ctx),
            None => FilterSet::new(),
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`Resource`]
pub struct ResourceBuilder {
    name: &'static str,
    table: &'static str,
    fields: IndexMap<&'static str, FieldSchema>,
    sortable: Vec<&'static str>,
    relations: Vec<Relation>,
    hidden: Vec<&'static str>,
    must_exist: Vec<ExistenceConstraint>,
    must_be_unique: Vec<UniquenessConstraint>,
    create_body: Option<ObjectSchema>,
    update_body: Option<ObjectSchema>,
    pre_filter: Option<PreFilter>,
}

impl ResourceBuilder {
    /// Declare a filterable field and its schema
    pub fn field(mut self, name: &'static str, schema: FieldSchema) -> Self {
        self.fields.insert(name, schema);
        self
    }

    pub fn sortable(mut self, fields: &[&'static str]) -> Self {
        self.sortable = fields.to_vec();
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn hidden(mut self, fields: &[&'static str]) -> Self {
        self.hidden = fields.to_vec();
        self
    }

    /// Declare that `field` must reference an existing row of `table`
    pub fn must_exist(
        mut self,
        resource: &'static str,
        table: &'static str,
        field: &'static str,
    ) -> Self {
        self.must_exist.push(ExistenceConstraint {
            resource,
            table,
            field,
        });
        self
    }

    pub fn unique(mut self, field: &'static str) -> Self {
        self.must_be_unique.push(UniquenessConstraint::single(field));
        self
    }

    pub fn unique_group(mut self, fields: &[&'static str]) -> Self {
        self.must_be_unique
            .push(UniquenessConstraint::composite(fields));
        self
    }

    /// Body schema for `create`. Without one, create requests pass through
    /// unvalidated.
    pub fn create_body(mut self, schema: ObjectSchema) -> Self {
        self.create_body = Some(schema);
        self
    }

    /// Body schema for `update`. Without one, update requests pass through
    /// unvalidated.
    pub fn update_body(mut self, schema: ObjectSchema) -> Self {
        self.update_body = Some(schema);
        self
    }

    pub fn pre_filter(
        mut self,
        hook: impl Fn(&RequestContext) -> FilterSet + Send + Sync + 'static,
    ) -> Self {
        self.pre_filter = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Arc<Resource> {
        let filterable: IndexMap<String, FieldSchema> = self
            .fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let sortable: Vec<String> = self.sortable.iter().map(|s| s.to_string()).collect();
        let includes: Vec<String> = self.relations.iter().map(|r| r.name.to_string()).collect();

        let schemas = ActionSchemas::standard(
            QuerySchema::list(filterable, sortable, includes.clone()),
            QuerySchema::includes_only(includes),
            self.create_body,
            self.update_body,
        );

        Arc::new(Resource {
            name: self.name,
            table: self.table,
            fields: self.fields,
            sortable: self.sortable,
            relations: self.relations,
            hidden: self.hidden,
            must_exist: self.must_exist,
            must_be_unique: self.must_be_unique,
            schemas,
            pre_filter: self.pre_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldSchema;

    #[test]
    fn test_uniqueness_message_single() {
        let constraint = UniquenessConstraint::single("username");
        assert_eq!(constraint.message(), "username field must be unique");
    }

    #[test]
    fn test_uniqueness_message_pair() {
        let constraint = UniquenessConstraint::composite(&["article_id", "tag_id"]);
        assert_eq!(
            constraint.message(),
            "article_id and tag_id fields must be unique"
        );
    }

    #[test]
    fn test_uniqueness_message_triple() {
        let constraint = UniquenessConstraint::composite(&["a", "b", "c"]);
        assert_eq!(constraint.message(), "a, b and c fields must be unique");
    }

    #[test]
    fn test_builder_collects_configuration() {
        let resource = Resource::builder("Article", "articles")
            .field("id", FieldSchema::number())
            .field("title", FieldSchema::string())
            .sortable(&["id", "title"])
            .relation(Relation::belongs_to("user", "users", "user_id"))
            .must_exist("User", "users", "user_id")
            .unique("title")
            .build();

        assert_eq!(resource.name(), "Article");
        assert_eq!(resource.table(), "articles");
        assert_eq!(resource.fields().len(), 2);
        assert_eq!(resource.sortable(), &["id", "title"]);
        assert!(resource.relation("user").is_some());
        assert!(resource.relation("tags").is_none());
        assert_eq!(resource.existence_constraints().len(), 1);
        assert_eq!(resource.uniqueness_constraints().len(), 1);
    }

    #[test]
    fn test_pre_filter_defaults_to_empty() {
        let resource = Resource::builder("Tag", "tags")
            .field("id", FieldSchema::number())
            .build();
        let ctx = RequestContext::default();
        assert!(resource.pre_filter(&ctx).is_empty());
    }

    #[test]
    fn test_pre_filter_hook_applies() {
        use crate::core::filter::{Filter, Operator};
        use serde_json::json;

        let resource = Resource::builder("Article", "articles")
            .field("id", FieldSchema::number())
            .pre_filter(|_ctx| {
                vec![Filter::new("status", Operator::Eq, json!("published"))]
                    .into_iter()
                    .collect()
            })
            .build();
        let ctx = RequestContext::default();
        assert_eq!(resource.pre_filter(&ctx).0.len(), 1);
    }
}
