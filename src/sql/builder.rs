//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a record descriptor.

use super::params::PgBindValue;
use crate::error::StorageError;
use crate::record::RecordDescriptor;
use crate::store::Row;

/// Quote identifier for PostgreSQL (safe: only from validated descriptors).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn select_column_list(record: &RecordDescriptor) -> String {
    record
        .fields
        .iter()
        .map(|f| quoted(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(record: &RecordDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(record),
        quoted(record.table_name),
        quoted(record.primary_key().name),
        n
    );
    q
}

/// SELECT one page ordered by primary key.
pub fn select_page(record: &RecordDescriptor, offset: u64, limit: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(record),
        quoted(record.table_name),
        quoted(record.primary_key().name),
        limit,
        offset
    );
    q
}

/// INSERT the non-key fields present in `row`; absent fields take the column default.
pub fn insert(record: &RecordDescriptor, row: &Row) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in record.writable_fields() {
        let Some(v) = row.get(f.name) else { continue };
        let n = q.push_param(PgBindValue::from_field(f, v)?);
        cols.push(quoted(f.name));
        placeholders.push(format!("${}::{}", n, f.field_type.pg_type()));
    }
    let table = quoted(record.table_name);
    let returning = select_column_list(record);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    Ok(q)
}

/// UPDATE by id: SET only non-key fields present in `row`. With nothing to set, selects the row instead.
pub fn update(record: &RecordDescriptor, id: i64, row: &Row) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in record.writable_fields() {
        let Some(v) = row.get(f.name) else { continue };
        let n = q.push_param(PgBindValue::from_field(f, v)?);
        sets.push(format!("{} = ${}::{}", quoted(f.name), n, f.field_type.pg_type()));
    }
    if sets.is_empty() {
        return Ok(select_by_id(record, id));
    }
    let id_param = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(record.table_name),
        sets.join(", "),
        quoted(record.primary_key().name),
        id_param,
        select_column_list(record)
    );
    Ok(q)
}

/// DELETE by id.
pub fn delete(record: &RecordDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        quoted(record.table_name),
        quoted(record.primary_key().name),
        n
    );
    q
}
