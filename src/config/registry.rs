//! Resource registry: the record types mounted by this process and the router built from them.

use crate::error::{ConfigError, StorageError};
use crate::openapi;
use crate::record::{Record, RecordDescriptor};
use crate::routes::{common_routes, record_routes};
use crate::state::AppState;
use crate::store::SessionProvider;
use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Request bodies above this many bytes are rejected with 413.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

struct Mounted {
    descriptor: &'static RecordDescriptor,
    routes: fn() -> Router<AppState>,
}

/// Registered record types in registration order. Route segments are unique.
pub struct ResourceRegistry {
    mounted: Vec<Mounted>,
    segments: HashSet<&'static str>,
    max_body_bytes: usize,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        ResourceRegistry {
            mounted: Vec::new(),
            segments: HashSet::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `R` under its route segment.
    pub fn register<R: Record>(&mut self) -> Result<&mut Self, ConfigError> {
        let descriptor = R::descriptor();
        descriptor.validate()?;
        if !self.segments.insert(descriptor.route_segment) {
            return Err(ConfigError::DuplicatePathSegment(descriptor.route_segment.to_string()));
        }
        tracing::info!("- {}", descriptor.route_segment);
        self.mounted.push(Mounted {
            descriptor,
            routes: record_routes::<R>,
        });
        Ok(self)
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static RecordDescriptor> + '_ {
        self.mounted.iter().map(|m| m.descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Create every registered table that does not exist yet.
    pub async fn ensure_tables(&self, sessions: &dyn SessionProvider) -> Result<(), StorageError> {
        for descriptor in self.descriptors() {
            sessions.ensure_table(descriptor).await?;
        }
        Ok(())
    }

    /// Common routes, one CRUDL group per registered type and `/openapi.json`.
    pub fn router(&self, state: AppState) -> Router {
        let doc = Arc::new(openapi::document(self.descriptors()));
        let mut app = common_routes().route(
            "/openapi.json",
            get(move || {
                let doc = Arc::clone(&doc);
                async move { Json(doc.as_ref().clone()) }
            }),
        );
        for mounted in &self.mounted {
            app = app.merge((mounted.routes)());
        }
        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(self.max_body_bytes)),
        )
        .with_state(state)
    }
}
