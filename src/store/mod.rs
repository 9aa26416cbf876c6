//! Storage boundary: request-scoped sessions and the providers that open them.
//!
//! Sessions move rows as JSON objects keyed by field name; typed records are converted at the
//! service layer. A session that is dropped without `commit` discards its writes.

mod memory;
mod postgres;

pub use memory::InMemorySessionProvider;
pub use postgres::{ensure_database_exists, PgSessionProvider};

use crate::error::StorageError;
use crate::record::RecordDescriptor;
use async_trait::async_trait;

/// One stored row: field name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A transactional unit of work scoped to one request.
#[async_trait]
pub trait Session: Send {
    /// Fetch one row by primary key.
    async fn get(&mut self, record: &RecordDescriptor, id: i64) -> Result<Option<Row>, StorageError>;

    /// Insert `row` when it has no key, otherwise overwrite the stored row with that key.
    /// On return `row` holds the stored values, including the assigned key and defaults.
    async fn add(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError>;

    async fn delete(&mut self, record: &RecordDescriptor, id: i64) -> Result<(), StorageError>;

    /// Up to `limit` rows after skipping `offset`, in primary key order.
    async fn query(&mut self, record: &RecordDescriptor, offset: u64, limit: u64) -> Result<Vec<Row>, StorageError>;

    /// Make all writes so far durable. The session stays usable afterwards.
    async fn commit(&mut self) -> Result<(), StorageError>;

    /// Reload `row` from storage by its key.
    async fn refresh(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError>;
}

/// Opens sessions and manages per-type storage.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError>;

    /// Create the table for `record` if it does not exist yet.
    async fn ensure_table(&self, record: &RecordDescriptor) -> Result<(), StorageError>;

    /// Cheap liveness check behind `/ready`.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Primary key value of `row`, if it has one.
pub fn row_id(record: &RecordDescriptor, row: &Row) -> Option<i64> {
    row.get(record.primary_key().name).and_then(|v| v.as_i64())
}
