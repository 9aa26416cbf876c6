//! crudl: generic CRUDL REST resources over PostgreSQL.
//!
//! Declare a record with [`record!`], register it on a [`ResourceRegistry`], and the registry's
//! router serves create, list, read, update and delete under the record's route segment.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod openapi;
pub mod record;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{ResourceRegistry, Settings};
pub use error::{AppError, ConfigError, StorageError, ValidationError};
pub use models::Catalog;
pub use record::{FieldDescriptor, FieldType, Patch, Record, RecordDescriptor};
pub use routes::{common_routes, record_routes};
pub use service::CrudService;
pub use state::AppState;
pub use store::{ensure_database_exists, InMemorySessionProvider, PgSessionProvider, Session, SessionProvider};
