//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::Methodology;

/// Suffix shared by all analysis parameter files
pub const PARAMETER_FILE_SUFFIX: &str = ".tra.yaml";

/// Directory (relative to the root) holding parameter files
pub const ANALYSES_DIR: &str = "analyses";

/// Represents a TRA project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .tra/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".tra").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".tra").exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::write_structure(root)
    }

    /// Initialize even if .tra/ exists, overwriting the config
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let tra_dir = root.join(".tra");
        std::fs::create_dir_all(&tra_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(tra_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::create_dir_all(root.join(ANALYSES_DIR))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# TRA Project Configuration

# Author recorded in generated parameter files
# author: ""

# Default output format (auto, yaml, json, csv, md)
# default_format: auto

# Fixed seed for reproducible runs (omit for a fresh seed per run)
# seed: 42

# Run Monte Carlo chunks on all cores
# parallel: true

# Abort analyses that run longer than this many seconds
# timeout_secs: 300
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .tra configuration directory
    pub fn tra_dir(&self) -> PathBuf {
        self.root.join(".tra")
    }

    /// Directory holding parameter files
    pub fn analyses_dir(&self) -> PathBuf {
        self.root.join(ANALYSES_DIR)
    }

    /// Default path for a new parameter file
    pub fn parameter_path(&self, methodology: Methodology, risk_id: &str) -> PathBuf {
        let stem = if risk_id.is_empty() {
            methodology.as_str().to_string()
        } else {
            format!("{}-{}", risk_id.to_lowercase(), methodology.as_str())
        };
        self.analyses_dir()
            .join(format!("{}{}", stem, PARAMETER_FILE_SUFFIX))
    }

    /// Iterate all parameter files under the project root
    pub fn iter_parameter_files(&self) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".tra")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| is_parameter_file(e.path()))
            .map(|e| e.path().to_path_buf())
    }
}

/// Whether `path` names a parameter file
pub fn is_parameter_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(PARAMETER_FILE_SUFFIX)
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a TRA project (searched from {searched_from:?}). Run 'tra init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("TRA project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
