//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Project;

/// TRA configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Author recorded in generated parameter files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Fixed seed for every run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Run Monte Carlo chunks in parallel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Per-run time limit in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_for(project.as_ref())
    }

    /// Same as [`Config::load`] with an explicit project (or none)
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/tra/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.tra/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.tra_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        // A freshly initialized config is all comments
        let value = match serde_yml::from_str::<serde_yml::Value>(&contents) {
            Ok(serde_yml::Value::Null) => return None,
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                return None;
            }
        };
        match serde_yml::from_value::<Config>(value) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Settings from `TRA_*` variables; unparseable values are ignored
    fn from_env(get: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            author: get("TRA_AUTHOR"),
            default_format: get("TRA_FORMAT"),
            seed: get("TRA_SEED").and_then(|v| v.trim().parse().ok()),
            parallel: get("TRA_PARALLEL").and_then(|v| parse_bool(&v)),
            timeout_secs: get("TRA_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tra")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.parallel.is_some() {
            self.parallel = other.parallel;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }

    /// Get the author name, falling back to the login name
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Parallel execution, on unless configured off
    pub fn parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
