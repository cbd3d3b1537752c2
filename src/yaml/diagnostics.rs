//! YAML error diagnostics with source spans

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML syntax or shape error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid parameter file: {message}")]
#[diagnostic(code(tra::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,
}

impl YamlSyntaxError {
    /// Create a diagnostic from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error raised while loading a YAML file
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(tra::yaml::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convert a 1-based line/column to a byte offset, clamped to the source
pub(crate) fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (i, text) in source.split('\n').enumerate() {
        if i + 1 == line {
            let col = column.saturating_sub(1);
            let within = text
                .char_indices()
                .nth(col)
                .map(|(byte, _)| byte)
                .unwrap_or(text.len());
            return line_start + within;
        }
        line_start += text.len() + 1;
    }
    source.len().saturating_sub(1)
}

/// Suggest a fix based on the error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate key") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("expected block end") {
        return Some("Check your indentation - it may be inconsistent.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    if msg_lower.contains("missing field") {
        return Some("Add the missing field; `tra new <methodology>` writes a complete starter file".to_string());
    }

    if msg_lower.contains("unknown variant") {
        return Some("Check the spelling of the value against the allowed variants".to_string());
    }

    if msg_lower.contains("invalid type") {
        return Some("Numbers must not be quoted; lists use `- item` or `[a, b]`".to_string());
    }

    None
}
