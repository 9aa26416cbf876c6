//! CrudService: generic CRUDL over typed records, plus descriptor-driven shape validation.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::{Page, ShapeValidator, DEFAULT_LIMIT, MAX_LIMIT};
