//! Create-if-missing DDL for record tables: one table per descriptor plus its indexes.
//! Existing tables are left as they are; there is no altering.

use crate::record::{FieldDefault, FieldDescriptor, FieldType, RecordDescriptor};
use crate::sql::quoted;
use serde_json::Value;

fn literal(v: &Value) -> String {
    match v {
        Value::Null => "NULL".into(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'::jsonb", other.to_string().replace('\'', "''")),
    }
}

fn column_def(f: &FieldDescriptor) -> String {
    if f.primary_key {
        return format!("{} BIGSERIAL PRIMARY KEY", quoted(f.name));
    }
    let mut def = format!("{} {}", quoted(f.name), f.field_type.pg_type());
    if !f.nullable {
        def.push_str(" NOT NULL");
    }
    match &f.default {
        Some(FieldDefault::CurrentTimestamp) => def.push_str(" DEFAULT NOW()"),
        Some(FieldDefault::Literal(v)) if f.field_type == FieldType::Json => {
            def.push_str(&format!(" DEFAULT '{}'::jsonb", v.to_string().replace('\'', "''")))
        }
        Some(FieldDefault::Literal(v)) => {
            def.push_str(" DEFAULT ");
            def.push_str(&literal(v));
        }
        None => {}
    }
    def
}

/// `CREATE TABLE IF NOT EXISTS` for the descriptor.
pub fn create_table_sql(record: &RecordDescriptor) -> String {
    let cols: Vec<String> = record.fields.iter().map(column_def).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(record.table_name),
        cols.join(",\n  ")
    )
}

/// One `CREATE INDEX IF NOT EXISTS ix_{table}_{field}` per indexed non-key field.
pub fn create_index_sql(record: &RecordDescriptor) -> Vec<String> {
    record
        .fields
        .iter()
        .filter(|f| f.indexed && !f.primary_key)
        .map(|f| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("ix_{}_{}", record.table_name, f.name)),
                quoted(record.table_name),
                quoted(f.name)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldOption;
    use serde_json::json;

    fn notes() -> RecordDescriptor {
        RecordDescriptor::new(
            "Note",
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
    fn table_ddl_maps_key_nullability_and_default() {
        let sql = create_table_sql(&notes());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"notes\" (\n  \"id\" BIGSERIAL PRIMARY KEY,\n  \"title\" TEXT NOT NULL,\n  \"content\" TEXT,\n  \"timestamp\" TIMESTAMPTZ NOT NULL DEFAULT NOW()\n)"
        );
    }

    #[test]
    fn indexes_cover_indexed_non_key_fields() {
        let sql = create_index_sql(&notes());
        assert_eq!(
            sql,
            vec![
                r#"CREATE INDEX IF NOT EXISTS "ix_notes_title" ON "notes" ("title")"#.to_string(),
                r#"CREATE INDEX IF NOT EXISTS "ix_notes_timestamp" ON "notes" ("timestamp")"#.to_string(),
            ]
        );
    }

    #[test]
    fn literal_defaults_are_escaped() {
        let mut f = FieldDescriptor::of::<String>("status");
        f.default = Some(FieldDefault::Literal(json!("it's new")));
        assert_eq!(column_def(&f), r#""status" TEXT NOT NULL DEFAULT 'it''s new'"#);
        f.field_type = FieldType::Boolean;
        f.default = Some(FieldDefault::Literal(json!(true)));
        assert_eq!(column_def(&f), r#""status" BOOLEAN NOT NULL DEFAULT TRUE"#);
    }
}
