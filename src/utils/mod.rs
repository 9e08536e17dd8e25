//! Utility modules for error handling, configuration and output naming

pub mod config;
pub mod error;
pub mod organizer;
pub mod tools;

// Re-export for convenience
pub use config::{RunConfig, SelectionPolicy, TagOverrides, TargetFormat};
pub use error::{RestrictionKind, TubeError};
pub use organizer::sanitize_filename;
