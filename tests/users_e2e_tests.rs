//! End-to-end tests for the user resource: uniqueness constraints, email
//! validation and hidden-field serialization.

mod fixture;

use axum::http::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_list_never_exposes_passwords() {
    let server = fixture::seeded_server().await;
    let response = server.get("/api/v1/users").await;
    response.assert_status_ok();
    let body: Value = response.json();
    for user in body["data"].as_array().unwrap() {
        assert!(user.get("password").is_none());
        assert!(user.get("username").is_some());
    }
}

#[tokio::test]
async fn test_create_user() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "Rosalind Trantow",
            "username": "rosalind4",
            "password": "Y9ECfszZ",
            "email": "rosalind.trantow35@gmail.com"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["username"], json!("rosalind4"));
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_create_duplicate_username_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "Someone Else",
            "username": "user01",
            "password": "Y9ECfszZ",
            "email": "fresh@example.com"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"message": "username field must be unique"}));
}

#[tokio::test]
async fn test_create_duplicate_email_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "Someone Else",
            "username": "fresh-name",
            "password": "Y9ECfszZ",
            "email": "user01@example.com"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"message": "email field must be unique"}));
}

#[tokio::test]
async fn test_create_invalid_email_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "Rosalind Trantow",
            "username": "rosalind4",
            "password": "Y9ECfszZ",
            "email": "Rosalind.Trantow35@gmail"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"message": "\"email\" must be a valid email"}));
}

#[tokio::test]
async fn test_create_short_password_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "Rosalind Trantow",
            "username": "rosalind4",
            "password": "abc",
            "email": "rosalind@example.com"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"message": "\"password\" length must be at least 6 characters long"})
    );
}

#[tokio::test]
async fn test_update_to_own_value_is_not_a_conflict() {
    let server = fixture::seeded_server().await;
    // user 1 keeps its own username and email: the self-match is excluded
    let response = server
        .put("/api/v1/users/1")
        .json(&json!({
            "name": "User 01 renamed",
            "username": "user01",
            "email": "user01@example.com"
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], json!("User 01 renamed"));
}

#[tokio::test]
async fn test_update_to_someone_elses_username_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .put("/api/v1/users/2")
        .json(&json!({
            "name": "User 02",
            "username": "user01",
            "email": "user02@example.com"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"message": "username field must be unique"}));
}

#[tokio::test]
async fn test_update_password_is_optional() {
    let server = fixture::seeded_server().await;
    let response = server
        .put("/api/v1/users/3")
        .json(&json!({
            "name": "User 03",
            "username": "user03",
            "email": "user03@example.com"
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_unknown_body_field_is_rejected() {
    let server = fixture::seeded_server().await;
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "name": "X",
            "username": "x1",
            "password": "longenough",
            "email": "x@example.com",
            "role": "admin"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"message": "\"role\" is not allowed"}));
}

#[tokio::test]
async fn test_users_include_their_articles() {
    let server = fixture::seeded_server().await;
    let response = server
        .get("/api/v1/users/1")
        .add_query_param("includes[]", "articles")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    // Seed: user 1 owns articles 1 and 2
    let articles = body["data"]["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 2);
}

#[tokio::test]
async fn test_destroy_user_cascades_to_articles() {
    let server = fixture::seeded_server().await;
    let response = server.delete("/api/v1/users/1").await;
    response.assert_status(StatusCode::NO_CONTENT);

    // user 1 owned articles 1 and 2
    let response = server.get("/api/v1/articles/1").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let response = server.get("/api/v1/articles/2").await;
    response.assert_status(StatusCode::NOT_FOUND);
}
