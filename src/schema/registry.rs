//! Embedded JSON schemas

use rust_embed::Embed;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Schema for analysis parameter files
pub const ANALYSIS_SCHEMA: &str = "analysis.schema.json";

/// Access to the JSON schemas compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Schema source by file name
    pub fn get(&self, name: &str) -> Option<String> {
        EmbeddedSchemas::get(name)
            .and_then(|file| String::from_utf8(file.data.into_owned()).ok())
    }

    /// Schema for parameter files
    pub fn analysis(&self) -> Option<String> {
        self.get(ANALYSIS_SCHEMA)
    }

    /// Names of all embedded schemas
    pub fn names(&self) -> Vec<String> {
        EmbeddedSchemas::iter().map(|n| n.into_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_schema_is_embedded() {
        let registry = SchemaRegistry::new();
        let schema = registry.analysis().unwrap();
        let json: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert_eq!(json["type"], "object");
        assert!(registry.names().contains(&ANALYSIS_SCHEMA.to_string()));
    }

    #[test]
    fn test_unknown_schema() {
        assert!(SchemaRegistry::new().get("nope.schema.json").is_none());
    }
}
