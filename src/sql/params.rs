//! Convert row values (serde_json::Value) to typed values sqlx can bind, guided by the field's type.

use crate::error::StorageError;
use crate::record::{FieldDescriptor, FieldType};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null(FieldType),
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl PgBindValue {
    /// Typed value for `field`. Values have been shape-validated already, so a mismatch is a storage fault.
    pub fn from_field(field: &FieldDescriptor, v: &Value) -> Result<Self, StorageError> {
        let mismatch = || StorageError::Decode(format!("field {} expects {}, got {}", field.name, field.field_type.describe(), v));
        if v.is_null() {
            return Ok(PgBindValue::Null(field.field_type));
        }
        Ok(match field.field_type {
            FieldType::Integer => PgBindValue::I64(v.as_i64().ok_or_else(mismatch)?),
            FieldType::Int32 => PgBindValue::I32(
                v.as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(mismatch)?,
            ),
            FieldType::Float => PgBindValue::F64(v.as_f64().ok_or_else(mismatch)?),
            FieldType::Text => PgBindValue::Text(v.as_str().ok_or_else(mismatch)?.to_string()),
            FieldType::Boolean => PgBindValue::Bool(v.as_bool().ok_or_else(mismatch)?),
            FieldType::Timestamp => {
                let s = v.as_str().ok_or_else(mismatch)?;
                let t = DateTime::parse_from_rfc3339(s).map_err(|_| mismatch())?;
                PgBindValue::Timestamp(t.with_timezone(&Utc))
            }
            FieldType::Json => PgBindValue::Json(v.clone()),
        })
    }
}

fn type_info_for(field_type: FieldType) -> PgTypeInfo {
    match field_type {
        FieldType::Integer => <i64 as Type<Postgres>>::type_info(),
        FieldType::Int32 => <i32 as Type<Postgres>>::type_info(),
        FieldType::Float => <f64 as Type<Postgres>>::type_info(),
        FieldType::Text => <String as Type<Postgres>>::type_info(),
        FieldType::Boolean => <bool as Type<Postgres>>::type_info(),
        FieldType::Timestamp => <DateTime<Utc> as Type<Postgres>>::type_info(),
        FieldType::Json => <Value as Type<Postgres>>::type_info(),
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(&self, buf: &mut <Postgres as Database>::ArgumentBuffer<'q>) -> Result<IsNull, BoxDynError> {
        match self {
            PgBindValue::Null(_) => Ok(IsNull::Yes),
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            PgBindValue::I32(n) => <i32 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
            PgBindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null(t) => type_info_for(*t),
            PgBindValue::Bool(_) => type_info_for(FieldType::Boolean),
            PgBindValue::I32(_) => type_info_for(FieldType::Int32),
            PgBindValue::I64(_) => type_info_for(FieldType::Integer),
            PgBindValue::F64(_) => type_info_for(FieldType::Float),
            PgBindValue::Text(_) => type_info_for(FieldType::Text),
            PgBindValue::Timestamp(_) => type_info_for(FieldType::Timestamp),
            PgBindValue::Json(_) => type_info_for(FieldType::Json),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_by_declared_field_type() {
        let f = FieldDescriptor::of::<i64>("n");
        assert_eq!(PgBindValue::from_field(&f, &json!(5)).unwrap(), PgBindValue::I64(5));
        let f = FieldDescriptor::of::<f64>("x");
        assert_eq!(PgBindValue::from_field(&f, &json!(2)).unwrap(), PgBindValue::F64(2.0));
        let f = FieldDescriptor::of::<Option<String>>("s");
        assert_eq!(PgBindValue::from_field(&f, &Value::Null).unwrap(), PgBindValue::Null(FieldType::Text));
    }

    #[test]
    fn parses_timestamps_and_rejects_mismatches() {
        let f = FieldDescriptor::created_at("timestamp");
        let v = PgBindValue::from_field(&f, &json!("2024-05-01T10:00:00+02:00")).unwrap();
        assert_eq!(
            v,
            PgBindValue::Timestamp("2024-05-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert!(PgBindValue::from_field(&f, &json!(12)).is_err());
    }
}
