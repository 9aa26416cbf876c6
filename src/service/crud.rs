//! Generic CRUDL over any `Record`, executed against one request-scoped session.

use super::validation::{Page, ShapeValidator};
use crate::error::{AppError, FieldError, StorageError, ValidationError};
use crate::record::{Record, RecordDescriptor};
use crate::store::{Row, Session};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// Validate against the full-record shape, insert, and return the stored record with its key and timestamp.
    pub async fn create<R: Record>(session: &mut dyn Session, body: Value) -> Result<R, AppError> {
        let record = R::descriptor();
        let input: R::Input = decode_body(ShapeValidator::full(record, body)?)?;
        let mut row = to_row(&input)?;
        row.remove(record.primary_key().name);
        session.add(record, &mut row).await?;
        session.commit().await?;
        session.refresh(record, &mut row).await?;
        let created: R = from_row(row)?;
        tracing::info!(resource = record.route_segment, id = created.id(), "record created");
        Ok(created)
    }

    /// One page in primary key order.
    pub async fn list<R: Record>(session: &mut dyn Session, page: Page) -> Result<Vec<R>, AppError> {
        let record = R::descriptor();
        let rows = session.query(record, page.offset, page.limit).await?;
        rows.into_iter()
            .map(|row| from_row(row).map_err(AppError::from))
            .collect()
    }

    pub async fn read<R: Record>(session: &mut dyn Session, id: i64) -> Result<R, AppError> {
        let record = R::descriptor();
        let row = session.get(record, id).await?.ok_or_else(|| not_found(record, id))?;
        Ok(from_row(row)?)
    }

    /// Fetch, validate against the partial shape, apply present fields, write back.
    pub async fn update<R: Record>(session: &mut dyn Session, id: i64, body: Value) -> Result<R, AppError> {
        let record = R::descriptor();
        let stored = session.get(record, id).await?.ok_or_else(|| not_found(record, id))?;
        let mut current: R = from_row(stored)?;
        let patch: R::Update = decode_body(ShapeValidator::partial(record, body)?)?;
        current.apply(patch);
        let mut row = to_row(&current)?;
        session.add(record, &mut row).await?;
        session.commit().await?;
        session.refresh(record, &mut row).await?;
        let updated: R = from_row(row)?;
        tracing::info!(resource = record.route_segment, id, "record updated");
        Ok(updated)
    }

    pub async fn delete<R: Record>(session: &mut dyn Session, id: i64) -> Result<(), AppError> {
        let record = R::descriptor();
        if session.get(record, id).await?.is_none() {
            return Err(not_found(record, id));
        }
        session.delete(record, id).await?;
        session.commit().await?;
        tracing::info!(resource = record.route_segment, id, "record deleted");
        Ok(())
    }
}

fn not_found(record: &RecordDescriptor, id: i64) -> AppError {
    AppError::NotFound {
        resource: record.route_segment.to_string(),
        id,
    }
}

/// Typed shape from a validated body. Failures here are still client errors.
fn decode_body<T: DeserializeOwned>(row: Row) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| FieldError::body("type", e.to_string()).into())
}

fn to_row<T: Serialize>(value: &T) -> Result<Row, StorageError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StorageError::Decode(format!("expected an object, got {}", other))),
        Err(e) => Err(StorageError::Decode(e.to_string())),
    }
}

fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StorageError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StorageError::Decode(e.to_string()))
}
