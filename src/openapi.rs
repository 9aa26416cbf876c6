//! OpenAPI document generated from registered descriptors. One tag per route segment.

use crate::record::{FieldDescriptor, FieldType, RecordDescriptor};
use utoipa::openapi::path::{
    HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{
    ArrayBuilder, KnownFormat, ObjectBuilder, Ref, Schema, SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::tag::TagBuilder;
use utoipa::openapi::{ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, RefOr, Required};

const JSON: &str = "application/json";

pub fn document<'a>(records: impl IntoIterator<Item = &'a RecordDescriptor>) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut components = ComponentsBuilder::new();
    let mut tags = Vec::new();
    for record in records {
        let seg = record.route_segment;
        let input = format!("{}Input", record.name);
        let update = format!("{}Update", record.name);

        components = components
            .schema(record.name, object_schema(record.fields.iter(), |f| !f.nullable))
            .schema(&input, object_schema(record.writable_fields(), |f| f.required_on_create()))
            .schema(&update, object_schema(record.writable_fields(), |_| false));
        tags.push(TagBuilder::new().name(seg).build());

        let list = operation(seg, "list", format!("List {}", seg))
            .parameter(query_param("offset", "Rows to skip", None))
            .parameter(query_param("limit", "Page size", Some(crate::service::MAX_LIMIT)))
            .response(
                "200",
                json_response(
                    "One page in primary key order",
                    Schema::Array(ArrayBuilder::new().items(schema_ref(record.name)).build()).into(),
                ),
            )
            .response("422", plain_response("Invalid paging parameters"));
        let create = operation(seg, "create", format!("Create one {} record", seg))
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(JSON, ContentBuilder::new().schema(Some(schema_ref(&input))).build())
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("201", json_response("Created", schema_ref(record.name)))
            .response("422", plain_response("Validation failed"));
        let read = operation(seg, "read", format!("Read one {} record", seg))
            .parameter(id_param())
            .response("200", json_response("Found", schema_ref(record.name)))
            .response("404", plain_response("Not found"));
        let update_op = operation(seg, "update", format!("Update fields of one {} record", seg))
            .parameter(id_param())
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(JSON, ContentBuilder::new().schema(Some(schema_ref(&update))).build())
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("200", json_response("Updated", schema_ref(record.name)))
            .response("404", plain_response("Not found"))
            .response("422", plain_response("Validation failed"));
        let delete = operation(seg, "delete", format!("Delete one {} record", seg))
            .parameter(id_param())
            .response("204", plain_response("Deleted"))
            .response("404", plain_response("Not found"));

        let collection = format!("/{}", seg);
        let item = format!("/{}/{{id}}", seg);
        paths = paths
            .path(
                collection,
                PathItemBuilder::new()
                    .operation(HttpMethod::Get, list.build())
                    .operation(HttpMethod::Post, create.build())
                    .build(),
            )
            .path(
                item,
                PathItemBuilder::new()
                    .operation(HttpMethod::Get, read.build())
                    .operation(HttpMethod::Put, update_op.build())
                    .operation(HttpMethod::Delete, delete.build())
                    .build(),
            );
    }
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .tags(Some(tags))
        .build()
}

fn operation(tag: &str, verb: &str, summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .tag(tag)
        .operation_id(Some(format!("{}_{}", verb, tag)))
        .summary(Some(summary))
}

fn id_param() -> ParameterBuilder {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(integer_schema(None)))
}

fn query_param(name: &str, description: &str, maximum: Option<u64>) -> ParameterBuilder {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(integer_schema(maximum)))
}

fn integer_schema(maximum: Option<u64>) -> Schema {
    Schema::Object(
        ObjectBuilder::new()
            .schema_type(Type::Integer)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64)))
            .minimum(Some(0))
            .maximum(maximum)
            .build(),
    )
}

fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn json_response(description: &str, schema: RefOr<Schema>) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn plain_response(description: &str) -> Response {
    ResponseBuilder::new().description(description).build()
}

fn object_schema<'a>(
    fields: impl Iterator<Item = &'a FieldDescriptor>,
    required: impl Fn(&FieldDescriptor) -> bool,
) -> Schema {
    let mut object = ObjectBuilder::new().schema_type(Type::Object);
    for f in fields {
        object = object.property(f.name, field_schema(f));
        if required(f) {
            object = object.required(f.name);
        }
    }
    Schema::Object(object.build())
}

fn field_schema(f: &FieldDescriptor) -> Schema {
    let ty = match f.field_type {
        FieldType::Integer | FieldType::Int32 => Type::Integer,
        FieldType::Float => Type::Number,
        FieldType::Text | FieldType::Timestamp => Type::String,
        FieldType::Boolean => Type::Boolean,
        FieldType::Json => {
            return Schema::Object(ObjectBuilder::new().schema_type(SchemaType::AnyValue).build());
        }
    };
    let schema_type = if f.nullable {
        SchemaType::from_iter([ty, Type::Null])
    } else {
        SchemaType::new(ty)
    };
    let format = match f.field_type {
        FieldType::Integer => Some(KnownFormat::Int64),
        FieldType::Int32 => Some(KnownFormat::Int32),
        FieldType::Float => Some(KnownFormat::Double),
        FieldType::Timestamp => Some(KnownFormat::DateTime),
        _ => None,
    };
    Schema::Object(
        ObjectBuilder::new()
            .schema_type(schema_type)
            .format(format.map(SchemaFormat::KnownFormat))
            .build(),
    )
}
