//! CLI command implementations

pub mod completions;
pub mod config;
pub mod init;
pub mod new;
pub mod run;
pub mod validate;
