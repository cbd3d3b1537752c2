//! Schema validation of parameter files with source-annotated diagnostics

use jsonschema::error::ValidationErrorKind;
use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use std::path::Path;
use thiserror::Error;

use crate::schema::registry::SchemaRegistry;

/// Validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed: {summary}")]
#[diagnostic(code(tra::schema::validation_error))]
pub struct ValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    /// Get the number of violations
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Failure to set up the validator itself
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("embedded schema '{0}' is missing")]
    #[diagnostic(code(tra::schema::missing))]
    Missing(String),

    #[error("embedded schema is invalid: {0}")]
    #[diagnostic(code(tra::schema::invalid))]
    Invalid(String),
}

/// Compiled parameter-file schema
pub struct Validator {
    compiled: JsonValidator,
}

impl Validator {
    /// Compile the analysis schema from the registry
    pub fn new(registry: &SchemaRegistry) -> Result<Self, SchemaError> {
        let schema_str = registry
            .analysis()
            .ok_or_else(|| SchemaError::Missing(crate::schema::registry::ANALYSIS_SCHEMA.to_string()))?;
        let schema_json: JsonValue =
            serde_json::from_str(&schema_str).map_err(|e| SchemaError::Invalid(e.to_string()))?;
        let compiled = validator_for(&schema_json).map_err(|e| SchemaError::Invalid(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// Validate YAML content, reporting every violation
    pub fn validate(&self, content: &str, filename: &str) -> Result<(), ValidationError> {
        let yaml_value: serde_yml::Value = match serde_yml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                let span = find_error_span(content, e.location());
                let violation = SchemaViolation::new(
                    format!("YAML parse error: {}", e),
                    "invalid YAML".to_string(),
                    span,
                    Some("Check YAML syntax - proper indentation, colons, quotes".to_string()),
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        // Convert YAML value to JSON value for schema validation
        let json_value: JsonValue = match serde_json::to_value(&yaml_value) {
            Ok(v) => v,
            Err(e) => {
                let violation = SchemaViolation::new(
                    format!("Failed to convert YAML to JSON: {}", e),
                    "conversion error".to_string(),
                    (0, content.len()).into(),
                    None,
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let violations: Vec<SchemaViolation> = self
            .compiled
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }

    /// Read and validate a file
    pub fn validate_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        let filename = path.display().to_string();
        self.validate(&content, &filename)?;
        Ok(())
    }
}

/// Convert a JSON Schema validation error to our violation format
fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    let message = format_schema_error(error);
    let hint = format_error_hint(error);
    let help = generate_help_message(error);
    let span = find_path_span(content, &path);

    SchemaViolation::new(message, hint, span, help)
}

fn property_name(property: &JsonValue) -> String {
    property
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| property.to_string())
}

/// Format a JSON Schema error into a user-friendly message
fn format_schema_error(error: &JsonSchemaError) -> String {
    let path = if error.instance_path.as_str().is_empty() {
        "document root".to_string()
    } else {
        format!("'{}'", error.instance_path)
    };

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            format!("Missing required field: {} at {}", property_name(property), path)
        }
        ValidationErrorKind::Type { kind } => {
            format!("Wrong type at {}: expected {:?}", path, kind)
        }
        ValidationErrorKind::Enum { options } => {
            format!("Invalid value at {}: must be one of: {}", path, format_enum_options(options))
        }
        ValidationErrorKind::MinLength { limit } => {
            format!("Value at {} is too short: minimum {} characters", path, limit)
        }
        ValidationErrorKind::Minimum { limit } => {
            format!("Value at {} is too small: minimum {}", path, limit)
        }
        ValidationErrorKind::Maximum { limit } => {
            format!("Value at {} is too large: maximum {}", path, limit)
        }
        ValidationErrorKind::ExclusiveMinimum { limit } => {
            format!("Value at {} must be greater than {}", path, limit)
        }
        ValidationErrorKind::ExclusiveMaximum { limit } => {
            format!("Value at {} must be less than {}", path, limit)
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("Unknown field(s) at {}: {}", path, unexpected.join(", "))
        }
        ValidationErrorKind::Not { .. } => {
            format!("Conflicting fields at {}: 'value_at_risk' and 'var' are the same section", path)
        }
        _ => format!("Validation error at {}: {}", path, error),
    }
}

/// Format enum options as a string
fn format_enum_options(options: &JsonValue) -> String {
    if let Some(arr) = options.as_array() {
        arr.iter()
            .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        options.to_string()
    }
}

/// Generate a short hint for the error label
fn format_error_hint(error: &JsonSchemaError) -> String {
    match &error.kind {
        ValidationErrorKind::Required { .. } => "required field missing",
        ValidationErrorKind::Type { .. } => "wrong type",
        ValidationErrorKind::Enum { .. } => "invalid value",
        ValidationErrorKind::MinLength { .. } => "too short",
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::ExclusiveMinimum { .. } => {
            "too small"
        }
        ValidationErrorKind::Maximum { .. } | ValidationErrorKind::ExclusiveMaximum { .. } => {
            "too large"
        }
        ValidationErrorKind::AdditionalProperties { .. } => "unknown field",
        ValidationErrorKind::Not { .. } => "conflicting fields",
        _ => "validation error",
    }
    .to_string()
}

/// Generate a help message with suggestions for fixing the error
fn generate_help_message(error: &JsonSchemaError) -> Option<String> {
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            Some(format!("Add the '{}' field to your file", property_name(property)))
        }
        ValidationErrorKind::Enum { options } => {
            Some(format!("Valid values: {}", format_enum_options(options)))
        }
        ValidationErrorKind::Type { kind } => Some(format!("Expected value of type: {:?}", kind)),
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::Maximum { .. }
            if is_rating(error.instance_path.as_str()) =>
        {
            Some("Severity, occurrence and detection are rated from 1 to 10".to_string())
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            if unexpected.len() == 1 {
                Some(format!("Remove the '{}' field or check spelling", unexpected[0]))
            } else {
                Some("Remove unknown fields or check spelling".to_string())
            }
        }
        ValidationErrorKind::Not { .. } => {
            Some("Keep one of 'value_at_risk' or 'var' and remove the other".to_string())
        }
        _ => None,
    }
}

fn is_rating(path: &str) -> bool {
    ["/severity", "/occurrence", "/detection"]
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

fn first_line_span(content: &str) -> SourceSpan {
    let len = content.find('\n').unwrap_or(content.len()).max(1);
    (0, len).into()
}

/// Find the span (byte offset, length) for a YAML parser error location
fn find_error_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    match location {
        Some(loc) => {
            let offset = crate::yaml::diagnostics::line_col_to_offset(content, loc.line(), loc.column());
            let rest = &content[offset.min(content.len())..];
            let len = rest.find('\n').unwrap_or(rest.len()).max(1);
            (offset, len).into()
        }
        None => first_line_span(content),
    }
}

/// Find the span for a JSON pointer (e.g. `/failure_modes/1/severity`) in YAML content.
///
/// Each path segment is searched for after the previous match, so repeated
/// keys in list items resolve to the right occurrence.
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    let parts: Vec<&str> = json_path.split('/').filter(|s| !s.is_empty()).collect();

    let mut from = 0;
    let mut found = None;
    for part in parts {
        let hit = match part.parse::<usize>() {
            Ok(index) => find_list_item(content, from, index),
            Err(_) => find_key(content, from, part),
        };
        match hit {
            Some((next, span)) => {
                from = next;
                found = Some(span);
            }
            None => break,
        }
    }

    found.unwrap_or_else(|| first_line_span(content))
}

/// Lines of `content` with their byte offsets
fn lines_with_offsets(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.split('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len() + 1;
        Some((start, line))
    })
}

/// Find `key:` at or after `from`; returns (search position for children, span of the line)
fn find_key(content: &str, from: usize, key: &str) -> Option<(usize, SourceSpan)> {
    let pattern = format!("{}:", key);
    lines_with_offsets(content)
        .filter(|(start, line)| start + line.len() >= from)
        .find_map(|(start, line)| {
            let body = line.trim_start().trim_start_matches("- ");
            let key_start = start + line.len() - body.len();
            (key_start >= from && body.starts_with(&pattern)).then(|| {
                let span: SourceSpan = (key_start, body.len()).into();
                (key_start + pattern.len(), span)
            })
        })
}

/// Find the `index`-th block list item after `from`
fn find_list_item(content: &str, from: usize, index: usize) -> Option<(usize, SourceSpan)> {
    let mut item_indent = None;
    let mut seen = 0;

    for (start, line) in lines_with_offsets(content) {
        if start < from {
            continue;
        }
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        if !trimmed.starts_with('-') {
            match item_indent {
                Some(level) if indent <= level => return None,
                _ => continue,
            }
        }
        match item_indent {
            None => item_indent = Some(indent),
            Some(level) if indent > level => continue,
            Some(level) if indent < level => return None,
            _ => {}
        }
        if seen == index {
            let span: SourceSpan = (start + indent, trimmed.len()).into();
            return Some((start + indent, span));
        }
        seen += 1;
    }
    None
}
