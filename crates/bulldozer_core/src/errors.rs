//! Error types for the bulldozer policy engine.
//!
//! Two families of errors exist:
//!
//! - [`ConfigurationError`]: a policy file (or the operator's fallback file) could not be
//!   parsed or failed validation. Repository-local files that fail here are downgraded to
//!   "no policy" by the resolver and never abort processing.
//! - [`BulldozerError`]: a failure while evaluating or acting on a pull request. Every
//!   such error is scoped to one pull request and is caught at the pipeline boundary.

use thiserror::Error;

/// Policy file parsing and validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Failed to read configuration file: {path} - {reason}")]
    FileAccessError { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    ParseError { reason: String },

    #[error("Unsupported configuration version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Conflicting squash options: only one of {fields:?} may be set")]
    ConflictingSquashMarkers { fields: Vec<&'static str> },

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<serde_yaml::Error> for ConfigurationError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigurationError::ParseError {
            reason: value.to_string(),
        }
    }
}

/// Errors raised while processing a pull request.
#[derive(Error, Debug)]
pub enum BulldozerError {
    /// The policy file could not be fetched for a reason other than "not found".
    #[error("Failed to fetch configuration for {owner}/{repo} at {reference}")]
    ConfigTransport {
        owner: String,
        repo: String,
        reference: String,
        #[source]
        source: github_client::Error,
    },

    /// Data needed for an eligibility decision could not be fetched.
    #[error("Failed to fetch {what} for {pull_request}")]
    EvaluationData {
        what: &'static str,
        pull_request: String,
        #[source]
        source: github_client::Error,
    },

    /// An update, merge or branch deletion failed.
    #[error("Failed to {action} {pull_request}")]
    Action {
        action: &'static str,
        pull_request: String,
        #[source]
        source: github_client::Error,
    },

    /// A GitHub call outside of a single pull request's evaluation failed.
    #[error("GitHub request failed")]
    Client(#[from] github_client::Error),

    /// A webhook payload could not be interpreted.
    #[error("Invalid {event_type} payload: {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
