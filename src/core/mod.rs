//! Core module - project layout, configuration and identifiers

pub mod config;
pub mod identity;
pub mod project;

pub use config::Config;
pub use identity::{IdParseError, RecordId};
pub use project::{Project, ProjectError};
