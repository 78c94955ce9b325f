//! Server configuration: loading, schema, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning};
pub use schema::{ServerConfig, WireFormat};
pub use validation::{ValidationResult, Validator};
