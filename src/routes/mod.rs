//! Router construction: common routes and per-record CRUDL routes.

pub mod common;
pub mod record;

pub use common::common_routes;
pub use record::record_routes;
