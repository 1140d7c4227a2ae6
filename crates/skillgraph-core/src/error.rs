use serde::Serialize;
use thiserror::Error;

/// Longest raw model output kept in an error, in characters.
pub const MAX_RAW_EXCERPT: usize = 500;

/// User-facing error classification shared by every Skillgraph component.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedResponse,
    ExtractionFailed,
    IntentParseFailed,
    StorageUnavailable,
    EmptyQuery,
    UnrecognizedIntent,
}

/// Failure to validate language-model output against a fixed shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String, excerpt: String },

    #[error("Unrecognized intent type: {label:?}")]
    UnrecognizedIntent { label: Option<String> },
}

impl SchemaError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            excerpt: truncate_excerpt(raw),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::UnrecognizedIntent { .. } => ErrorKind::UnrecognizedIntent,
        }
    }
}

/// Start-up failure shared by both binaries.
#[derive(Error, Debug)]
pub enum SkillgraphError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for SkillgraphError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Cut raw text to [`MAX_RAW_EXCERPT`] characters, marking the cut.
pub fn truncate_excerpt(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(MAX_RAW_EXCERPT).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_is_truncated_on_char_boundary() {
        let raw = "é".repeat(MAX_RAW_EXCERPT + 10);
        let excerpt = truncate_excerpt(&raw);
        assert_eq!(excerpt.chars().count(), MAX_RAW_EXCERPT + 1);
        assert!(excerpt.ends_with('…'));
        assert_eq!(truncate_excerpt("short"), "short");
    }

    #[test]
    fn schema_error_kinds() {
        assert_eq!(
            SchemaError::malformed("no JSON", "hello").kind(),
            ErrorKind::MalformedResponse
        );
        let err = SchemaError::UnrecognizedIntent {
            label: Some("weather".to_string()),
        };
        assert_eq!(err.kind(), ErrorKind::UnrecognizedIntent);
    }
}
