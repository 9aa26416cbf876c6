//! In-memory session provider for tests and development (`DATABASE_URL=memory://`).

use super::{row_id, Row, Session, SessionProvider};
use crate::error::StorageError;
use crate::record::{FieldDefault, FieldDescriptor, RecordDescriptor};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

type Tables = Arc<RwLock<HashMap<String, Table>>>;

/// Tables shared by every session; each session stages its writes until `commit`.
#[derive(Clone, Default)]
pub struct InMemorySessionProvider {
    tables: Tables,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed row count of a table, for assertions.
    pub fn len(&self, record: &RecordDescriptor) -> Result<usize, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(record.table_name).map(|t| t.rows.len()).unwrap_or(0))
    }

    pub fn is_empty(&self, record: &RecordDescriptor) -> Result<bool, StorageError> {
        Ok(self.len(record)? == 0)
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError> {
        Ok(Box::new(InMemorySession {
            tables: self.tables.clone(),
            staged: BTreeMap::new(),
        }))
    }

    async fn ensure_table(&self, record: &RecordDescriptor) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.entry(record.table_name.to_string()).or_default();
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.tables.read().map_err(poisoned).map(|_| ())
    }
}

/// `None` in `staged` marks a pending delete.
pub struct InMemorySession {
    tables: Tables,
    staged: BTreeMap<(String, i64), Option<Row>>,
}

impl InMemorySession {
    fn lookup(&self, record: &RecordDescriptor, id: i64) -> Result<Option<Row>, StorageError> {
        if let Some(change) = self.staged.get(&(record.table_name.to_string(), id)) {
            return Ok(change.clone());
        }
        let tables = self.tables.read().map_err(poisoned)?;
        let table = tables.get(record.table_name).ok_or_else(|| no_table(record))?;
        Ok(table.rows.get(&id).cloned())
    }

    fn next_id(&self, record: &RecordDescriptor) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let table = tables.get_mut(record.table_name).ok_or_else(|| no_table(record))?;
        table.last_id += 1;
        Ok(table.last_id)
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn get(&mut self, record: &RecordDescriptor, id: i64) -> Result<Option<Row>, StorageError> {
        self.lookup(record, id)
    }

    async fn add(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError> {
        let (id, mut stored) = match row_id(record, row) {
            Some(id) => {
                let existing = self.lookup(record, id)?.ok_or_else(|| StorageError::RowMissing {
                    table: record.table_name.to_string(),
                    id,
                })?;
                (id, existing)
            }
            None => (self.next_id(record)?, Row::new()),
        };
        let inserting = stored.is_empty();
        for field in &record.fields {
            let value = if field.primary_key {
                Value::from(id)
            } else {
                match row.get(field.name) {
                    Some(v) => v.clone(),
                    None if inserting => default_value(field),
                    None => continue,
                }
            };
            if value.is_null() && !field.nullable {
                return Err(StorageError::Backend(format!(
                    "null value in column \"{}\" of \"{}\" violates not-null constraint",
                    field.name, record.table_name
                )));
            }
            stored.insert(field.name.to_string(), value);
        }
        self.staged
            .insert((record.table_name.to_string(), id), Some(stored.clone()));
        *row = stored;
        Ok(())
    }

    async fn delete(&mut self, record: &RecordDescriptor, id: i64) -> Result<(), StorageError> {
        if self.lookup(record, id)?.is_none() {
            return Err(StorageError::RowMissing {
                table: record.table_name.to_string(),
                id,
            });
        }
        self.staged.insert((record.table_name.to_string(), id), None);
        Ok(())
    }

    async fn query(&mut self, record: &RecordDescriptor, offset: u64, limit: u64) -> Result<Vec<Row>, StorageError> {
        let mut rows = {
            let tables = self.tables.read().map_err(poisoned)?;
            let table = tables.get(record.table_name).ok_or_else(|| no_table(record))?;
            table.rows.clone()
        };
        for ((table, id), change) in &self.staged {
            if table != record.table_name {
                continue;
            }
            match change {
                Some(row) => rows.insert(*id, row.clone()),
                None => rows.remove(id),
            };
        }
        Ok(rows
            .into_values()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().map_err(poisoned)?;
        for ((table, id), change) in std::mem::take(&mut self.staged) {
            let Some(table) = tables.get_mut(&table) else {
                return Err(StorageError::Backend(format!("relation \"{}\" does not exist", table)));
            };
            match change {
                Some(row) => table.rows.insert(id, row),
                None => table.rows.remove(&id),
            };
        }
        Ok(())
    }

    async fn refresh(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError> {
        let id = row_id(record, row).ok_or_else(|| StorageError::Decode("refresh of a row without a key".into()))?;
        *row = self.lookup(record, id)?.ok_or_else(|| StorageError::RowMissing {
            table: record.table_name.to_string(),
            id,
        })?;
        Ok(())
    }
}

fn default_value(field: &FieldDescriptor) -> Value {
    match &field.default {
        Some(FieldDefault::CurrentTimestamp) => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        Some(FieldDefault::Literal(v)) => v.clone(),
        None => Value::Null,
    }
}

fn no_table(record: &RecordDescriptor) -> StorageError {
    StorageError::Backend(format!("relation \"{}\" does not exist", record.table_name))
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Backend(format!("lock poisoned: {}", e))
}
