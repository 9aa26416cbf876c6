//! Shape validation derived from record descriptors: full-record (create), partial (update), paging, path ids.
//! Every offending field is reported, not only the first.

use crate::error::{FieldError, Location, ValidationError};
use crate::record::{FieldDefault, FieldDescriptor, FieldType, RecordDescriptor};
use crate::store::Row;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 100;

/// Offset/limit window for list requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

pub struct ShapeValidator;

impl ShapeValidator {
    /// Validate a create body against the full-record shape. All required fields must be present.
    /// Returns the known non-key fields, normalized; unknown keys and the key are dropped.
    /// Absent fields with a literal default take that default.
    pub fn full(record: &RecordDescriptor, body: Value) -> Result<Row, ValidationError> {
        Self::check(record, body, true)
    }

    /// Validate an update body: every field optional, present ones type-checked.
    pub fn partial(record: &RecordDescriptor, body: Value) -> Result<Row, ValidationError> {
        Self::check(record, body, false)
    }

    fn check(record: &RecordDescriptor, body: Value, require: bool) -> Result<Row, ValidationError> {
        let Value::Object(mut body) = body else {
            return Err(FieldError::body("type", "body must be a JSON object").into());
        };
        let mut out = Row::new();
        let mut errors = Vec::new();
        for f in record.writable_fields() {
            match body.remove(f.name) {
                Some(v) => match check_value(f, v) {
                    Ok(v) => {
                        out.insert(f.name.to_string(), v);
                    }
                    Err(e) => errors.push(e),
                },
                None if require && f.required_on_create() => {
                    errors.push(FieldError::new(Location::Body, f.name, "missing", "field is required"));
                }
                None if require => {
                    if let Some(FieldDefault::Literal(v)) = &f.default {
                        out.insert(f.name.to_string(), v.clone());
                    }
                }
                None => {}
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(ValidationError { errors })
        }
    }

    /// Parse `offset` and `limit` query parameters. `limit` above the cap is rejected, not clamped.
    pub fn page(params: &HashMap<String, String>) -> Result<Page, ValidationError> {
        let mut page = Page::default();
        let mut errors = Vec::new();
        match query_u64(params, "offset", None) {
            Ok(Some(n)) => page.offset = n,
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
        match query_u64(params, "limit", Some(MAX_LIMIT)) {
            Ok(Some(n)) => page.limit = n,
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
        if errors.is_empty() {
            Ok(page)
        } else {
            Err(ValidationError { errors })
        }
    }

    /// Parse an `{id}` path segment as the integer primary key.
    pub fn path_id(raw: &str) -> Result<i64, ValidationError> {
        raw.parse::<i64>()
            .map_err(|_| FieldError::new(Location::Path, "id", "type", "must be an integer").into())
    }
}

fn query_u64(params: &HashMap<String, String>, name: &str, max: Option<u64>) -> Result<Option<u64>, FieldError> {
    let Some(raw) = params.get(name) else {
        return Ok(None);
    };
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FieldError::new(Location::Query, name, "type", "must be an integer"))?;
    if n < 0 {
        return Err(FieldError::new(Location::Query, name, "out_of_range", "must be greater than or equal to 0"));
    }
    let n = n as u64;
    if let Some(max) = max {
        if n > max {
            return Err(FieldError::new(
                Location::Query,
                name,
                "out_of_range",
                format!("must be less than or equal to {}", max),
            ));
        }
    }
    Ok(Some(n))
}

fn check_value(f: &FieldDescriptor, v: Value) -> Result<Value, FieldError> {
    if v.is_null() {
        return if f.nullable {
            Ok(v)
        } else {
            Err(FieldError::new(Location::Body, f.name, "null", "field may not be null"))
        };
    }
    let ok = match f.field_type {
        FieldType::Integer => v.is_i64(),
        FieldType::Int32 => v.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
        FieldType::Float => v.is_number(),
        FieldType::Text => v.is_string(),
        FieldType::Boolean => v.is_boolean(),
        FieldType::Json => true,
        FieldType::Timestamp => {
            return v
                .as_str()
                .and_then(normalize_timestamp)
                .map(Value::String)
                .ok_or_else(|| type_error(f));
        }
    };
    if ok {
        Ok(v)
    } else {
        Err(type_error(f))
    }
}

fn type_error(f: &FieldDescriptor) -> FieldError {
    FieldError::new(
        Location::Body,
        f.name,
        "type",
        format!("must be {}", f.field_type.describe()),
    )
}

/// RFC 3339 in UTC. Datetimes without an offset are taken as UTC.
fn normalize_timestamp(s: &str) -> Option<String> {
    let utc = match DateTime::parse_from_rfc3339(s) {
        Ok(t) => t.with_timezone(&Utc),
        Err(_) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())?
            .and_utc(),
    };
    Some(utc.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldDescriptor, FieldOption};
    use serde_json::json;

    fn notes() -> RecordDescriptor {
        RecordDescriptor::new(
            "Note",
            "notes",
            vec![
                FieldDescriptor::primary_key("id"),
                FieldDescriptor::of::<String>("title"),
                FieldDescriptor::of::<String>("content"),
                FieldDescriptor::of::<Option<i64>>("priority"),
                FieldDescriptor::created_at("timestamp"),
            ],
        )
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn fields(e: &ValidationError) -> Vec<(&str, &str)> {
        e.errors
            .iter()
            .map(|e| (e.field.as_deref().unwrap_or(""), e.code))
            .collect()
    }

    #[test]
    fn full_reports_every_missing_required_field() {
        let err = ShapeValidator::full(&notes(), json!({})).unwrap_err();
        assert_eq!(fields(&err), vec![("title", "missing"), ("content", "missing")]);
    }

    #[test]
    fn full_drops_key_and_unknown_fields() {
        let row = ShapeValidator::full(&notes(), json!({"id": 5, "title": "a", "content": "b", "test": "x"})).unwrap();
        assert_eq!(row.len(), 2);
        assert!(row.get("id").is_none());
        assert!(row.get("test").is_none());
    }

    #[test]
    fn type_and_null_errors_are_distinguished() {
        let err = ShapeValidator::full(&notes(), json!({"title": 1, "content": null, "priority": "high"})).unwrap_err();
        assert_eq!(
            fields(&err),
            vec![("title", "type"), ("content", "null"), ("priority", "type")]
        );
    }

    #[test]
    fn nullable_field_accepts_null() {
        let row = ShapeValidator::partial(&notes(), json!({"priority": null})).unwrap();
        assert_eq!(row["priority"], Value::Null);
    }

    #[test]
    fn partial_accepts_empty_body_and_rejects_non_object() {
        assert!(ShapeValidator::partial(&notes(), json!({})).unwrap().is_empty());
        let err = ShapeValidator::partial(&notes(), json!([1, 2])).unwrap_err();
        assert_eq!(err.errors[0].field, None);
        assert_eq!(err.errors[0].location, Location::Body);
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let row = ShapeValidator::partial(&notes(), json!({"timestamp": "2024-05-01T10:00:00+02:00"})).unwrap();
        assert_eq!(row["timestamp"], "2024-05-01T08:00:00Z");
        let row = ShapeValidator::partial(&notes(), json!({"timestamp": "2024-05-01T10:00:00.5"})).unwrap();
        assert_eq!(row["timestamp"], "2024-05-01T10:00:00.500Z");
        assert!(ShapeValidator::partial(&notes(), json!({"timestamp": "yesterday"})).is_err());
    }

    #[test]
    fn page_defaults_and_cap() {
        assert_eq!(ShapeValidator::page(&params(&[])).unwrap(), Page { offset: 0, limit: 100 });
        assert_eq!(
            ShapeValidator::page(&params(&[("offset", "5"), ("limit", "100")])).unwrap(),
            Page { offset: 5, limit: 100 }
        );
        let err = ShapeValidator::page(&params(&[("limit", "101")])).unwrap_err();
        assert_eq!(fields(&err), vec![("limit", "out_of_range")]);
        assert_eq!(err.errors[0].location, Location::Query);
    }

    #[test]
    fn page_rejects_negative_and_non_integer() {
        let err = ShapeValidator::page(&params(&[("offset", "-1"), ("limit", "ten")])).unwrap_err();
        assert_eq!(fields(&err), vec![("offset", "out_of_range"), ("limit", "type")]);
    }

    #[test]
    fn full_fills_literal_defaults_only_when_absent() {
        let d = RecordDescriptor::new(
            "Ticket",
            "tickets",
            vec![
                FieldDescriptor::primary_key("id"),
                FieldDescriptor::of::<String>("status").with_options(&[FieldOption::default_value("open")]),
            ],
        );
        assert_eq!(ShapeValidator::full(&d, json!({})).unwrap()["status"], "open");
        assert_eq!(ShapeValidator::full(&d, json!({"status": "closed"})).unwrap()["status"], "closed");
        assert!(ShapeValidator::partial(&d, json!({})).unwrap().is_empty());
    }

    #[test]
    fn int32_fields_are_range_checked() {
        let d = RecordDescriptor::new(
            "Counter",
            "counters",
            vec![FieldDescriptor::primary_key("id"), FieldDescriptor::of::<i32>("hits")],
        );
        assert!(ShapeValidator::full(&d, json!({"hits": 2147483647})).is_ok());
        let err = ShapeValidator::full(&d, json!({"hits": 2147483648i64})).unwrap_err();
        assert_eq!(fields(&err), vec![("hits", "type")]);
        assert_eq!(err.errors[0].message, "must be a 32-bit integer");
    }

    #[test]
    fn path_id_must_be_integer() {
        assert_eq!(ShapeValidator::path_id("42").unwrap(), 42);
        let err = ShapeValidator::path_id("abc").unwrap_err();
        assert_eq!(err.errors[0].location, Location::Path);
    }
}
