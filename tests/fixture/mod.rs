//! Shared end-to-end fixture: the blog domain
//!
//! Users, articles (with content and tags), and the articles-tags join,
//! wired over a seeded in-memory store. Seeds are deterministic: 10 users,
//! 20 articles (ids 1–20, titles in reverse lexicographic order so sorting
//! by title inverts the id order), one content row per article and 10 tags.

use resourceful::prelude::*;
use serde_json::json;
use std::sync::Arc;

pub struct Fixture {
    pub users: Arc<Resource>,
    pub articles: Arc<Resource>,
    pub contents: Arc<Resource>,
    pub tags: Arc<Resource>,
}

pub fn resources() -> Fixture {
    let users = Resource::builder("User", "users")
        .field("id", FieldSchema::number())
        .field("name", FieldSchema::string())
        .field("username", FieldSchema::string())
        .field("email", FieldSchema::string())
        .field("created_at", FieldSchema::date())
        .field("updated_at", FieldSchema::date())
        .sortable(&["id", "name", "username", "email", "created_at", "updated_at"])
        .relation(Relation::has_many("articles", "articles", "user_id"))
        .hidden(&["password"])
        .unique("username")
        .unique("email")
        .create_body(
            ObjectSchema::new()
                .field("name", FieldSchema::string().max_length(100).required())
                .field("username", FieldSchema::string().max_length(100).required())
                .field(
                    "password",
                    FieldSchema::string().min_length(6).max_length(50).required(),
                )
                .field(
                    "email",
                    FieldSchema::string().max_length(100).email().required(),
                ),
        )
        .update_body(
            ObjectSchema::new()
                .field("name", FieldSchema::string().max_length(100).required())
                .field("username", FieldSchema::string().max_length(100).required())
                .field("password", FieldSchema::string().min_length(6).max_length(50))
                .field(
                    "email",
                    FieldSchema::string().max_length(100).email().required(),
                ),
        )
        .build();

    let articles = Resource::builder("Article", "articles")
        .field("id", FieldSchema::number())
        .field("user_id", FieldSchema::number())
        .field("title", FieldSchema::string())
        .field("description", FieldSchema::string())
        .field("status", FieldSchema::string())
        .field("created_at", FieldSchema::date())
        .field("updated_at", FieldSchema::date())
        .sortable(&[
            "id",
            "user_id",
            "title",
            "description",
            "status",
            "created_at",
            "updated_at",
        ])
        .relation(Relation::belongs_to("user", "users", "user_id"))
        .relation(Relation::has_one("content", "contents", "article_id"))
        .relation(Relation::belongs_to_many(
            "tags",
            "tags",
            "articles_tags",
            "article_id",
            "tag_id",
        ))
        .must_exist("User", "users", "user_id")
        .create_body(article_body())
        .update_body(article_body())
        .build();

    let contents = Resource::builder("Content", "contents")
        .field("id", FieldSchema::number())
        .field("article_id", FieldSchema::number())
        .field("created_at", FieldSchema::date())
        .field("updated_at", FieldSchema::date())
        .sortable(&["id", "article_id", "created_at", "updated_at"])
        .relation(Relation::belongs_to("article", "articles", "article_id"))
        .must_exist("Article", "articles", "article_id")
        .unique("article_id")
        .create_body(content_body())
        .update_body(content_body())
        .build();

    let tags = Resource::builder("Tag", "tags")
        .field("id", FieldSchema::number())
        .field("name", FieldSchema::string())
        .field("created_at", FieldSchema::date())
        .field("updated_at", FieldSchema::date())
        .sortable(&["id", "name", "created_at", "updated_at"])
        .relation(Relation::belongs_to_many(
            "articles",
            "articles",
            "articles_tags",
            "tag_id",
            "article_id",
        ))
        .create_body(
            ObjectSchema::new().field("name", FieldSchema::string().max_length(100).required()),
        )
        .update_body(
            ObjectSchema::new().field("name", FieldSchema::string().max_length(100).required()),
        )
        .build();

    Fixture {
        users,
        articles,
        contents,
        tags,
    }
}

fn article_body() -> ObjectSchema {
    ObjectSchema::new()
        .field(
            "user_id",
            FieldSchema::number().integer().positive().required(),
        )
        .field("title", FieldSchema::string().max_length(100).required())
        .field(
            "description",
            FieldSchema::string().max_length(500).required(),
        )
        .field(
            "status",
            FieldSchema::string().one_of(&["published", "draft"]).required(),
        )
}

fn content_body() -> ObjectSchema {
    ObjectSchema::new()
        .field(
            "article_id",
            FieldSchema::number().integer().positive().required(),
        )
        .field("body", FieldSchema::string().required())
}

pub fn schema() -> InMemoryStore {
    InMemoryStore::builder()
        .table(TableDef::new("users").unique(&["username"]).unique(&["email"]))
        .table(TableDef::new("articles").foreign_key("user_id", "users", OnDelete::Cascade))
        .table(
            TableDef::new("contents")
                .unique(&["article_id"])
                .foreign_key("article_id", "articles", OnDelete::Cascade),
        )
        .table(TableDef::new("tags"))
        .table(
            TableDef::new("articles_tags")
                .pivot()
                .unique(&["article_id", "tag_id"])
                .foreign_key("article_id", "articles", OnDelete::Cascade)
                .foreign_key("tag_id", "tags", OnDelete::Cascade),
        )
        .build()
}

async fn seed(store: &InMemoryStore) {
    for i in 1..=10u32 {
        store
            .insert(
                "users",
                json!({
                    "name": format!("User {i:02}"),
                    "username": format!("user{i:02}"),
                    "password": "secret-hash",
                    "email": format!("user{i:02}@example.com"),
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .expect("seeding users");
    }
    for i in 1..=20u32 {
        store
            .insert(
                "articles",
                json!({
                    "user_id": i.div_ceil(2),
                    "title": format!("article {:02}", 21 - i),
                    "description": format!("description for article {i}"),
                    "status": "published",
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .expect("seeding articles");
        store
            .insert(
                "contents",
                json!({
                    "article_id": i,
                    "body": format!("body of article {i}"),
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .expect("seeding contents");
    }
    for i in 1..=10u32 {
        store
            .insert(
                "tags",
                json!({"name": format!("tag {i:02}")})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .expect("seeding tags");
    }
}

/// A test server over the seeded blog fixture
pub async fn seeded_server() -> axum_test::TestServer {
    let fixture = resources();
    let store = schema();
    seed(&store).await;

    let app = ServerBuilder::new()
        .with_store(store)
        .register_resource(fixture.users.clone())
        .register_resource(fixture.articles.clone())
        .register_resource(fixture.contents.clone())
        .register_resource(fixture.tags.clone())
        .register_relation(RelationResource::new(
            "articles-tags",
            fixture.articles.clone(),
            "article_id",
            fixture.tags.clone(),
            "tag_id",
            "tags",
        ))
        .build()
        .expect("building the test router");

    axum_test::TestServer::new(app)
}
