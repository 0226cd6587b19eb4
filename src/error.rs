//! Error types for the beacon engine.
//!
//! All errors are explicitly typed using thiserror. Analysis itself never
//! fails; errors surface only at construction time or from an injected
//! classifier, where they are caught and degraded.

use thiserror::Error;

/// Central error type for all beacon operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration error (missing rules file, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Regex pattern compilation error.
    #[error("Regex pattern error: {0}")]
    RegexPattern(#[from] regex::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(String),

    /// Semantic classifier failure. Non-fatal: the pipeline catches this
    /// and continues in rules-only mode.
    #[error("Classifier error: {0}")]
    Classifier(String),
}

impl BeaconError {
    /// Whether this error must abort initialization.
    ///
    /// Rules configuration is the only mandatory evidence source, so any
    /// error reaching it is fatal. Classifier errors never are.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Classifier(_))
    }

    /// Get user-friendly error message (hides internal details).
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "Invalid detection configuration",
            Self::RegexPattern(_) => "Invalid pattern configuration",
            Self::Json(_) => "Malformed configuration document",
            Self::Io(_) => "Could not read configuration file",
            Self::Classifier(_) => "Semantic analysis temporarily unavailable",
        }
    }
}

/// Result type alias for beacon operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_config() {
        let err = BeaconError::Config("rules file not found: rules.json".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: rules file not found: rules.json"
        );
    }

    #[test]
    fn error_display_classifier() {
        let err = BeaconError::Classifier("embedding backend gone".to_string());
        assert_eq!(err.to_string(), "Classifier error: embedding backend gone");
    }

    #[test]
    fn config_errors_are_fatal() {
        assert!(BeaconError::Config("x".to_string()).is_fatal());
        assert!(BeaconError::Io("x".to_string()).is_fatal());
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        assert!(BeaconError::RegexPattern(regex_err).is_fatal());
    }

    #[test]
    fn classifier_errors_are_not_fatal() {
        assert!(!BeaconError::Classifier("x".to_string()).is_fatal());
    }

    #[test]
    fn user_message_hides_details() {
        let err = BeaconError::Config("/etc/secret/path.json missing".to_string());
        assert!(!err.user_message().contains("secret"));
    }
}
