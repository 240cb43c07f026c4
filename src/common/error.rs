//! Error types for restprobe
//!
//! Error messages are meant to be actionable: they name the scenario,
//! step or variable involved and, where possible, how to fix it.
//! Assertion mismatches are not errors; they are recorded in the report.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for restprobe
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Definition Errors ===
    #[error("Invalid scenario '{scenario}': {message}")]
    Validation { scenario: String, message: String },

    #[error("Template '{template}' references '{{{{{variable}}}}}', which is not set in the scenario context")]
    TemplateResolution { template: String, variable: String },

    // === Transport Errors ===
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Scenario run was cancelled")]
    Cancelled,

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a validation error for a named scenario
    pub fn validation(scenario: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            scenario: scenario.to_string(),
            message: message.into(),
        }
    }

    /// Create a template resolution error
    pub fn template_resolution(template: &str, variable: &str) -> Self {
        Self::TemplateResolution {
            template: template.to_string(),
            variable: variable.to_string(),
        }
    }

    /// Whether this error came from the transport rather than the definition
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::RequestFailed(_) | Error::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_resolution_message_names_variable() {
        let err = Error::template_resolution("/objects/{{createdId}}", "createdId");
        assert_eq!(
            err.to_string(),
            "Template '/objects/{{createdId}}' references '{{createdId}}', which is not set in the scenario context"
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::Timeout(100).is_transport());
        assert!(Error::RequestFailed("refused".into()).is_transport());
        assert!(!Error::Cancelled.is_transport());
        assert!(!Error::validation("x", "bad").is_transport());
    }
}
