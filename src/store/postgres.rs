//! PostgreSQL session provider. Each session lazily opens one transaction; dropping it rolls back.

use super::{row_id, Row, Session, SessionProvider};
use crate::error::StorageError;
use crate::migration::{create_index_sql, create_table_sql};
use crate::record::{FieldType, RecordDescriptor};
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, Postgres, Row as _, Transaction};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgSessionProvider {
    pool: PgPool,
}

impl PgSessionProvider {
    pub fn new(pool: PgPool) -> Self {
        PgSessionProvider { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(PgSessionProvider { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionProvider for PgSessionProvider {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError> {
        Ok(Box::new(PgSession {
            pool: self.pool.clone(),
            tx: None,
        }))
    }

    async fn ensure_table(&self, record: &RecordDescriptor) -> Result<(), StorageError> {
        let ddl = create_table_sql(record);
        tracing::debug!(sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(&self.pool).await?;
        for sql in create_index_sql(record) {
            tracing::debug!(sql = %sql, "ensure index");
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        tracing::info!(table = record.table_name, "table ready");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    async fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StorageError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.tx.insert(tx))
    }

    async fn fetch_optional(&mut self, record: &RecordDescriptor, q: QueryBuf) -> Result<Option<Row>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let tx = self.tx().await?;
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let row = query.fetch_optional(&mut **tx).await?;
        row.map(|r| decode_row(record, &r)).transpose()
    }

    async fn fetch_all(&mut self, record: &RecordDescriptor, q: QueryBuf) -> Result<Vec<Row>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let tx = self.tx().await?;
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let rows = query.fetch_all(&mut **tx).await?;
        rows.iter().map(|r| decode_row(record, r)).collect()
    }

    async fn execute(&mut self, q: QueryBuf) -> Result<u64, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let tx = self.tx().await?;
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        Ok(query.execute(&mut **tx).await?.rows_affected())
    }
}

#[async_trait]
impl Session for PgSession {
    async fn get(&mut self, record: &RecordDescriptor, id: i64) -> Result<Option<Row>, StorageError> {
        self.fetch_optional(record, sql::select_by_id(record, id)).await
    }

    async fn add(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError> {
        let id = row_id(record, row);
        let q = match id {
            Some(id) => sql::update(record, id, row)?,
            None => sql::insert(record, row)?,
        };
        let stored = self
            .fetch_optional(record, q)
            .await?
            .ok_or_else(|| StorageError::RowMissing {
                table: record.table_name.to_string(),
                id: id.unwrap_or_default(),
            })?;
        *row = stored;
        Ok(())
    }

    async fn delete(&mut self, record: &RecordDescriptor, id: i64) -> Result<(), StorageError> {
        if self.execute(sql::delete(record, id)).await? == 0 {
            return Err(StorageError::RowMissing {
                table: record.table_name.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn query(&mut self, record: &RecordDescriptor, offset: u64, limit: u64) -> Result<Vec<Row>, StorageError> {
        self.fetch_all(record, sql::select_page(record, offset, limit)).await
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn refresh(&mut self, record: &RecordDescriptor, row: &mut Row) -> Result<(), StorageError> {
        let id = row_id(record, row).ok_or_else(|| StorageError::Decode("refresh of a row without a key".into()))?;
        *row = self
            .fetch_optional(record, sql::select_by_id(record, id))
            .await?
            .ok_or_else(|| StorageError::RowMissing {
                table: record.table_name.to_string(),
                id,
            })?;
        Ok(())
    }
}

fn decode_row(record: &RecordDescriptor, row: &PgRow) -> Result<Row, StorageError> {
    let mut out = Row::new();
    for f in &record.fields {
        let name = f.name;
        let value = match f.field_type {
            FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            FieldType::Int32 => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            FieldType::Float => row
                .try_get::<Option<f64>, _>(name)?
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
            FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            FieldType::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Micros, true))),
            FieldType::Json => row.try_get::<Option<Value>, _>(name)?,
        };
        out.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

/// Create the database named in `database_url` when it does not exist yet (connects to `postgres`).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StorageError> {
    let (admin_url, db_name) = split_db_name(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StorageError::Backend(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Admin URL (same server, `postgres` database) and the database named in `url`.
/// An empty name means the URL names no database.
fn split_db_name(url: &str) -> Result<(String, String), StorageError> {
    let scheme_end = url
        .find("://")
        .ok_or_else(|| StorageError::Backend("DATABASE_URL: missing scheme".into()))?
        + 3;
    let (without_query, query) = match url.split_once('?') {
        Some((head, q)) => (head, Some(q)),
        None => (url, None),
    };
    let (base, db_name) = match without_query.get(scheme_end..).and_then(|rest| rest.find('/')) {
        Some(slash) => without_query.split_at(scheme_end + slash + 1),
        None => return Ok((url.to_string(), String::new())),
    };
    let admin = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin, db_name.trim().to_string()))
}
