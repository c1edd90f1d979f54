//! Configuration module
//!
//! Loads and validates optional `punchline` YAML files: the joke endpoint,
//! request timeout, and reveal pacing.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, DEFAULT_MAX_CONFIG_SIZE, LoadResult, LoaderOptions};
pub use schema::RevealConfig;
pub use validation::{ValidationResult, Validator};
