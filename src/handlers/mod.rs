//! HTTP handlers for record CRUDL.

pub mod record;
