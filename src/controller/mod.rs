//! Generic controllers
//!
//! One shared implementation per controller kind, parameterized by resource
//! descriptors — no per-resource subclassing.

pub mod relation;
pub mod resource;

pub use relation::{RelationController, RelationResource};
pub use resource::{ItemResponse, ListResponse, PageResponse, ResourceController};

use crate::core::resource::Resource;
use crate::storage::Row;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Renders rows for the wire: hidden fields and pivot bookkeeping columns
/// are stripped, on the row itself and on any eager-loaded relation rows.
///
/// Hidden fields of related resources are resolved through the table map
/// collected from every registered resource, so an included `user` never
/// leaks its password no matter which resource loaded it.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    hidden_by_table: HashMap<String, Vec<String>>,
}

impl Serializer {
    pub fn from_resources(resources: &[Arc<Resource>]) -> Self {
        let hidden_by_table = resources
            .iter()
            .map(|r| {
                (
                    r.table().to_string(),
                    r.hidden().iter().map(|h| h.to_string()).collect(),
                )
            })
            .collect();
        Self { hidden_by_table }
    }

    /// Serialize a row of `resource`, including any loaded relations
    pub fn present(&self, resource: &Resource, mut row: Row) -> Value {
        for relation in resource.relations() {
            if let Some(loaded) = row.remove(relation.name) {
                let hidden = self.hidden_for(relation.table);
                let cleaned = match loaded {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| self.clean_value(item, hidden))
                            .collect(),
                    ),
                    other => self.clean_value(other, hidden),
                };
                row.insert(relation.name.to_string(), cleaned);
            }
        }

        let hidden: Vec<String> = resource.hidden().iter().map(|h| h.to_string()).collect();
        self.clean_value(Value::Object(row), &hidden)
    }

    fn hidden_for(&self, table: &str) -> &[String] {
        self.hidden_by_table
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn clean_value(&self, value: Value, hidden: &[String]) -> Value {
        match value {
            Value::Object(mut map) => {
                map.retain(|key, _| !key.starts_with("_pivot_") && !hidden.contains(key));
                Value::Object(map)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldSchema;
    use crate::core::resource::Relation;
    use serde_json::json;

    fn users() -> Arc<Resource> {
        Resource::builder("User", "users")
            .field("id", FieldSchema::number())
            .hidden(&["password"])
            .build()
    }

    fn articles() -> Arc<Resource> {
        Resource::builder("Article", "articles")
            .field("id", FieldSchema::number())
            .relation(Relation::belongs_to("user", "users", "user_id"))
            .relation(Relation::belongs_to_many(
                "tags",
                "tags",
                "articles_tags",
                "article_id",
                "tag_id",
            ))
            .build()
    }

    #[test]
    fn test_hidden_fields_stripped() {
        let users = users();
        let serializer = Serializer::from_resources(std::slice::from_ref(&users));
        let row = json!({"id": 1, "username": "a", "password": "secret"});
        let out = serializer.present(&users, row.as_object().cloned().unwrap());
        assert!(out.get("password").is_none());
        assert_eq!(out["username"], json!("a"));
    }

    #[test]
    fn test_pivot_columns_stripped_from_relations() {
        let articles = articles();
        let serializer = Serializer::from_resources(std::slice::from_ref(&articles));
        let row = json!({
            "id": 1,
            "tags": [{"id": 3, "name": "rust", "_pivot_article_id": 1, "_pivot_tag_id": 3}]
        });
        let out = serializer.present(&articles, row.as_object().cloned().unwrap());
        assert_eq!(out["tags"], json!([{"id": 3, "name": "rust"}]));
    }

    #[test]
    fn test_related_resource_hidden_fields_stripped() {
        let users = users();
        let articles = articles();
        let serializer = Serializer::from_resources(&[users, articles.clone()]);
        let row = json!({
            "id": 1,
            "user": {"id": 2, "username": "a", "password": "secret"}
        });
        let out = serializer.present(&articles, row.as_object().cloned().unwrap());
        assert_eq!(out["user"], json!({"id": 2, "username": "a"}));
    }
}
