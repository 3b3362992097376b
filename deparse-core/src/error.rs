use thiserror::Error;

use crate::types::Value;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running a parser.
///
/// Skipping a match is not an error; transforms signal it through
/// [`Extracted::Skip`](crate::rules::Extracted::Skip).
#[derive(Error, Debug)]
pub enum Error {
    /// Patterns compile lazily, so the offending text is carried along to
    /// tell which of many declared rules is broken.
    #[error("{message} in \"{pattern}\" pattern")]
    InvalidPattern { pattern: String, message: String },

    #[error("rule '{rule}' has no transform and no method named '{method}'")]
    UnresolvedFunction { rule: String, method: String },

    #[error("transform for rule '{rule}' failed: {source}")]
    Transform {
        rule: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rule '{rule}' aggregates into a map but produced {value:?}")]
    NotAMapping { rule: String, value: Value },

    #[error("rule '{name}' is declared more than once")]
    DuplicateRule { name: String },

    #[error("invalid rule configuration: {message}")]
    InvalidConfig { message: String },

    #[error("unknown output format '{name}' (expected json, yaml or flat)")]
    UnknownFormat { name: String },

    #[error("failed to load rules from {path}: {message}")]
    Config { path: String, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_message_names_pattern() {
        let err = Error::InvalidPattern {
            pattern: r"inalid (\d]".to_string(),
            message: "unclosed group".to_string(),
        };
        assert_eq!(err.to_string(), r#"unclosed group in "inalid (\d]" pattern"#);
    }

    #[test]
    fn test_unresolved_function_message() {
        let err = Error::UnresolvedFunction {
            rule: "price".to_string(),
            method: "f_price".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'price'"));
        assert!(message.contains("'f_price'"));
    }
}
