//! YAML loading with miette diagnostics

pub mod diagnostics;

use serde::de::DeserializeOwned;
use std::path::Path;

pub use diagnostics::{YamlError, YamlSyntaxError};

/// Deserialize YAML text, mapping failures to a source-annotated diagnostic
pub fn parse_yaml_str<T: DeserializeOwned>(source: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(source)
        .map_err(|e| YamlError::Syntax(YamlSyntaxError::from_serde_error(&e, source, filename)))
}

/// Read and deserialize a YAML file
pub fn parse_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T, YamlError> {
    let source = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_yaml_str(&source, &path.display().to_string())
}
