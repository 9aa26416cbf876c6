//! Per-record-type CRUDL routes under the type's path segment.
//! Collection paths answer with and without a trailing slash.

use crate::handlers::record::{create, delete, list, read, update};
use crate::record::Record;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn record_routes<R: Record>() -> Router<AppState> {
    let segment = R::descriptor().route_segment;
    let collection = format!("/{}", segment);
    let collection_slash = format!("/{}/", segment);
    let item = format!("/{}/:id", segment);
    Router::new()
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(&collection_slash, get(list::<R>).post(create::<R>))
        .route(&item, get(read::<R>).put(update::<R>).delete(delete::<R>))
}
