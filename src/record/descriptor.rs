//! Record type descriptors: the declarative shape of a resource (table, route segment, fields).

use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Semantic type of a field, independent of the storage engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    /// 32-bit integer, range-checked on input.
    Int32,
    Float,
    Text,
    Boolean,
    /// RFC 3339 / ISO-8601 on the wire, `TIMESTAMPTZ` in PostgreSQL.
    Timestamp,
    Json,
}

impl FieldType {
    /// PostgreSQL type name used in DDL and parameter casts.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldType::Integer => "BIGINT",
            FieldType::Int32 => "INTEGER",
            FieldType::Float => "DOUBLE PRECISION",
            FieldType::Text => "TEXT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMPTZ",
            FieldType::Json => "JSONB",
        }
    }

    /// Human readable name used in validation messages.
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::Integer => "an integer",
            FieldType::Int32 => "a 32-bit integer",
            FieldType::Float => "a number",
            FieldType::Text => "a string",
            FieldType::Boolean => "a boolean",
            FieldType::Timestamp => "an ISO-8601 datetime",
            FieldType::Json => "a JSON value",
        }
    }
}

/// Server-side default applied when a field is absent on insert.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldDefault {
    /// Time of insertion (`NOW()`).
    CurrentTimestamp,
    Literal(serde_json::Value),
}

/// Options accepted per field in `record!` declarations.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldOption {
    Index,
    /// Value used when the field is absent on create.
    Default(serde_json::Value),
}

impl FieldOption {
    pub fn default_value(v: impl Into<serde_json::Value>) -> Self {
        FieldOption::Default(v.into())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub primary_key: bool,
    pub indexed: bool,
    pub default: Option<FieldDefault>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        FieldDescriptor {
            name,
            field_type,
            nullable: false,
            primary_key: false,
            indexed: false,
            default: None,
        }
    }

    /// Descriptor for a Rust field type; `Option<T>` makes the field nullable.
    pub fn of<T: FieldKind>(name: &'static str) -> Self {
        FieldDescriptor {
            nullable: T::NULLABLE,
            ..FieldDescriptor::new(name, T::FIELD_TYPE)
        }
    }

    /// Server-generated integer primary key.
    pub fn primary_key(name: &'static str) -> Self {
        FieldDescriptor {
            primary_key: true,
            indexed: true,
            ..FieldDescriptor::new(name, FieldType::Integer)
        }
    }

    /// Creation timestamp defaulted by the server.
    pub fn created_at(name: &'static str) -> Self {
        FieldDescriptor {
            indexed: true,
            default: Some(FieldDefault::CurrentTimestamp),
            ..FieldDescriptor::new(name, FieldType::Timestamp)
        }
    }

    pub fn with_options(mut self, options: &[FieldOption]) -> Self {
        for option in options {
            match option {
                FieldOption::Index => self.indexed = true,
                FieldOption::Default(v) => self.default = Some(FieldDefault::Literal(v.clone())),
            }
        }
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Must be supplied on create: not the key, not nullable, not defaulted.
    pub fn required_on_create(&self) -> bool {
        !self.primary_key && !self.nullable && !self.has_default()
    }
}

#[derive(Clone, Debug)]
pub struct RecordDescriptor {
    /// Model name, used for lookups from configuration and in OpenAPI schema titles.
    pub name: &'static str,
    pub table_name: &'static str,
    pub route_segment: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Route segment defaults to the table name.
    pub fn new(name: &'static str, table_name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        RecordDescriptor {
            name,
            table_name,
            route_segment: table_name,
            fields,
        }
    }

    pub fn with_route(mut self, route_segment: &'static str) -> Self {
        self.route_segment = route_segment;
        self
    }

    /// First primary key field. Call `validate` before relying on there being exactly one.
    pub fn primary_key(&self) -> &FieldDescriptor {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .unwrap_or(&self.fields[0])
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields a client may send: everything except the primary key, in declaration order.
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.primary_key)
    }

    /// Check the structural rules every mounted descriptor must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(self.table_name) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "table",
                name: self.table_name.to_string(),
            });
        }
        if !is_identifier(self.route_segment) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "route segment",
                name: self.route_segment.to_string(),
            });
        }
        let mut seen = HashSet::new();
        for f in &self.fields {
            if !is_identifier(f.name) {
                return Err(ConfigError::InvalidIdentifier {
                    kind: "field",
                    name: f.name.to_string(),
                });
            }
            if !seen.insert(f.name) {
                return Err(ConfigError::DuplicateField {
                    table: self.table_name.to_string(),
                    field: f.name.to_string(),
                });
            }
        }
        let keys: Vec<&FieldDescriptor> = self.fields.iter().filter(|f| f.primary_key).collect();
        match keys.as_slice() {
            [key] if key.field_type == FieldType::Integer && !key.nullable => Ok(()),
            [key] => Err(ConfigError::InvalidPrimaryKey {
                table: self.table_name.to_string(),
                column: key.name.to_string(),
            }),
            _ => Err(ConfigError::PrimaryKeyCount {
                table: self.table_name.to_string(),
                count: keys.len(),
            }),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern"))
        .is_match(s)
}

/// Maps a Rust field type to its semantic type and nullability.
pub trait FieldKind {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;
}

impl FieldKind for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;
}

impl FieldKind for i32 {
    const FIELD_TYPE: FieldType = FieldType::Int32;
}

impl FieldKind for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;
}

impl FieldKind for String {
    const FIELD_TYPE: FieldType = FieldType::Text;
}

impl FieldKind for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;
}

impl FieldKind for chrono::DateTime<chrono::Utc> {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;
}

impl FieldKind for serde_json::Value {
    const FIELD_TYPE: FieldType = FieldType::Json;
}

impl<T: FieldKind> FieldKind for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> RecordDescriptor {
        RecordDescriptor::new(
            "notes",
            "notes",
            vec![
                FieldDescriptor::primary_key("id"),
                FieldDescriptor::of::<String>("title").with_options(&[FieldOption::Index]),
                FieldDescriptor::of::<Option<String>>("content"),
                FieldDescriptor::created_at("timestamp"),
            ],
        )
    }

    #[test]
    fn field_kind_maps_option_to_nullable() {
        let f = FieldDescriptor::of::<Option<i64>>("count");
        assert_eq!(f.field_type, FieldType::Integer);
        assert!(f.nullable);
        assert!(!FieldDescriptor::of::<bool>("done").nullable);
    }

    #[test]
    fn required_on_create_excludes_key_nullable_and_defaulted() {
        let d = notes();
        let required: Vec<&str> = d
            .fields
            .iter()
            .filter(|f| f.required_on_create())
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["title"]);
    }

    #[test]
    fn route_defaults_to_table_name() {
        let d = notes();
        assert_eq!(d.route_segment, "notes");
        assert_eq!(d.with_route("memos").route_segment, "memos");
    }

    #[test]
    fn validate_accepts_well_formed_descriptor() {
        notes().validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_or_extra_primary_key() {
        let mut d = notes();
        d.fields.remove(0);
        assert!(matches!(d.validate(), Err(ConfigError::PrimaryKeyCount { count: 0, .. })));

        let mut d = notes();
        d.fields.push(FieldDescriptor::primary_key("other_id"));
        assert!(matches!(d.validate(), Err(ConfigError::PrimaryKeyCount { count: 2, .. })));
    }

    #[test]
    fn validate_rejects_text_primary_key() {
        let mut d = notes();
        d.fields[0].field_type = FieldType::Text;
        assert!(matches!(d.validate(), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn validate_rejects_bad_identifiers_and_duplicates() {
        let d = notes().with_route("My Notes");
        assert!(matches!(d.validate(), Err(ConfigError::InvalidIdentifier { kind: "route segment", .. })));

        let mut d = notes();
        d.fields.push(FieldDescriptor::of::<String>("title"));
        assert!(matches!(d.validate(), Err(ConfigError::DuplicateField { .. })));
    }
}
