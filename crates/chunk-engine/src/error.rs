use thiserror::Error;

/// Result type for chunk extraction operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during configuration, registration, or streaming
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Configuration rejected with one or more aggregated violations
    #[error(transparent)]
    InvalidConfig(#[from] ConfigViolations),

    /// Failed to parse a source window
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error occurred while reading a streamed source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChunkerError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}

/// Every violation found in one configuration, reported together so the
/// author sees all problems in a single registration attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration for language {language_id:?}: {}", format_violations(.violations))]
pub struct ConfigViolations {
    /// The `language_id` of the offending configuration (may itself be empty)
    pub language_id: String,
    /// Individual violations, in detection order
    pub violations: Vec<ConfigViolation>,
}

fn format_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single configuration violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigViolation {
    /// The language identifier is empty or blank
    #[error("language_id must not be empty")]
    EmptyLanguageId,

    /// The configuration declares no chunkable node types
    #[error("chunk_types must not be empty")]
    EmptyChunkTypes,

    /// A node-type string is empty or contains whitespace
    #[error("node type {node_type:?} in {field} is empty or contains whitespace")]
    MalformedNodeType {
        node_type: String,
        field: &'static str,
    },

    /// The same node types appear in both chunk_types and ignore_types
    #[error("node types present in both chunk_types and ignore_types: {}", .0.join(", "))]
    OverlappingTypes(Vec<String>),

    /// A rule matches nothing
    #[error("rule #{index} has an empty node-type set")]
    EmptyRulePattern { index: usize },

    /// A rule carries a negative priority
    #[error("rule #{index} has negative priority {priority}")]
    NegativePriority { index: usize, priority: i32 },

    /// The language identifier is already taken in the registry
    #[error("language {0:?} is already registered")]
    DuplicateLanguage(String),

    /// The alias is already taken in the registry
    #[error("alias {alias:?} already refers to {existing:?}")]
    DuplicateAlias { alias: String, existing: String },

    /// An alias string is empty or contains whitespace
    #[error("alias {0:?} is empty or contains whitespace")]
    MalformedAlias(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregated_display_lists_every_violation() {
        let err = ConfigViolations {
            language_id: "broken".to_string(),
            violations: vec![
                ConfigViolation::EmptyChunkTypes,
                ConfigViolation::NegativePriority {
                    index: 2,
                    priority: -1,
                },
            ],
        };

        let rendered = err.to_string();
        assert!(rendered.contains("chunk_types must not be empty"));
        assert!(rendered.contains("rule #2 has negative priority -1"));
    }

    #[test]
    fn overlap_violation_names_the_types() {
        let violation =
            ConfigViolation::OverlappingTypes(vec!["comment".to_string(), "string".to_string()]);
        assert_eq!(
            violation.to_string(),
            "node types present in both chunk_types and ignore_types: comment, string"
        );
    }
}
