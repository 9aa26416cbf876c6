#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use crudl::{AppState, Catalog, InMemorySessionProvider, ResourceRegistry};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Router over an in-memory store; `store` shares its tables for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: InMemorySessionProvider,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_registry(Catalog::all().unwrap()).await
    }

    pub async fn with_registry(registry: ResourceRegistry) -> Self {
        let store = InMemorySessionProvider::new();
        registry.ensure_tables(&store).await.unwrap();
        let router = registry.router(AppState::new(store.clone()));
        TestApp { router, store }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let raw = body.map(|b| b.to_string());
        self.send_raw(method, uri, raw).await
    }

    pub async fn send_raw(&self, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(raw) => {
                req = req
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, raw.len());
                Body::from(raw)
            }
            None => Body::empty(),
        };
        self.send_request(req.body(body).unwrap()).await
    }

    pub async fn send_request(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }
}

/// Field names of the 422 details, in order.
pub fn detail_fields(body: &Value) -> Vec<String> {
    body["error"]["details"]
        .as_array()
        .map(|d| {
            d.iter()
                .map(|e| e["field"].as_str().unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default()
}
