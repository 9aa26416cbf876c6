//! A record type declared outside the crate, mounted next to the built-in ones.

mod common;

use axum::http::StatusCode;
use common::{detail_fields, TestApp};
use crudl::{ConfigError, ResourceRegistry};
use serde_json::json;

crudl::record! {
    /// Todo item with a nullable note and mixed column types.
    #[record(table = "tasks", route = "todo", input = TaskInput, update = TaskUpdate)]
    pub struct Task {
        pub label: String [index],
        pub done: bool,
        pub weight: f64,
        pub note: Option<String>,
        pub meta: Option<serde_json::Value>,
        pub rank: Option<i32>,
        pub status: String [default = "open"],
    }
}

async fn app() -> TestApp {
    let mut registry = ResourceRegistry::new();
    registry.register::<Task>().unwrap();
    TestApp::with_registry(registry).await
}

#[tokio::test]
async fn custom_record_is_served_under_its_route() {
    let app = app().await;
    let (status, created) = app
        .post("/todo", json!({ "label": "ship", "done": false, "weight": 1.5, "meta": { "tags": ["x"] } }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["note"], serde_json::Value::Null);
    assert_eq!(created["status"], "open");
    assert_eq!(created["meta"]["tags"][0], "x");
    let (status, _) = app.get("/tasks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nullable_fields_are_optional_on_create() {
    let app = app().await;
    let (status, body) = app.post("/todo", json!({ "label": "ship" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(detail_fields(&body), vec!["done", "weight"]);
}

#[tokio::test]
async fn explicit_null_clears_and_absent_keeps() {
    let app = app().await;
    let (_, created) = app
        .post("/todo", json!({ "label": "ship", "done": false, "weight": 2, "note": "soon" }))
        .await;
    let uri = format!("/todo/{}", created["id"]);

    let (status, kept) = app.put(&uri, json!({ "done": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["note"], "soon");
    assert_eq!(kept["done"], true);

    let (status, cleared) = app.put(&uri, json!({ "note": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["note"], serde_json::Value::Null);
    assert_eq!(cleared["label"], "ship");
    assert_eq!(cleared["timestamp"], created["timestamp"]);
}

#[tokio::test]
async fn type_mismatches_are_reported_per_field() {
    let app = app().await;
    let (status, body) = app
        .post("/todo", json!({ "label": 3, "done": "yes", "weight": "heavy" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(detail_fields(&body), vec!["label", "done", "weight"]);
}

#[tokio::test]
async fn out_of_range_i32_names_the_field() {
    let app = app().await;
    let (status, body) = app
        .post("/todo", json!({ "label": "ship", "done": false, "weight": 1, "rank": 2_147_483_648i64 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(detail_fields(&body), vec!["rank"]);
    assert_eq!(body["error"]["details"][0]["code"], "type");

    let (status, created) = app
        .post("/todo", json!({ "label": "ship", "done": false, "weight": 1, "rank": -7 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["rank"], -7);
}

#[tokio::test]
async fn common_routes_are_mounted() {
    let app = app().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "ok");

    let (_, body) = app.get("/version").await;
    assert_eq!(body["name"], "crudl");

    let (status, doc) = app.get("/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
    assert!(doc["paths"]["/todo/{id}"]["put"].is_object());
    assert_eq!(doc["components"]["schemas"]["TaskInput"]["required"], json!(["label", "done", "weight"]));
}

#[test]
fn route_segments_must_be_unique() {
    let mut registry = ResourceRegistry::new();
    registry.register::<Task>().unwrap();
    assert!(matches!(
        registry.register::<Task>().err(),
        Some(ConfigError::DuplicatePathSegment(ref s)) if s == "todo"
    ));
}
