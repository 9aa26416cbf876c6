//! Startup configuration: process settings and the registry of mounted record types.

pub mod registry;
pub mod settings;

pub use registry::{ResourceRegistry, DEFAULT_MAX_BODY_BYTES};
pub use settings::{Settings, MEMORY_URL};
