use super::*;
use std::error::Error as StdError;

#[test]
fn test_configuration_error_messages() {
    let error = ConfigurationError::UnsupportedVersion { version: 2 };
    assert_eq!(error.to_string(), "Unsupported configuration version: 2");

    let error = ConfigurationError::ConflictingSquashMarkers {
        fields: vec!["message_delimiter", "message_end_marker"],
    };
    assert_eq!(
        error.to_string(),
        "Conflicting squash options: only one of [\"message_delimiter\", \"message_end_marker\"] may be set"
    );
}

#[test]
fn test_configuration_error_from_yaml() {
    let yaml_error = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();

    let error = ConfigurationError::from(yaml_error);

    assert!(matches!(error, ConfigurationError::ParseError { .. }));
}

#[test]
fn test_evaluation_data_error_keeps_source() {
    let error = BulldozerError::EvaluationData {
        what: "status checks",
        pull_request: "octo-org/widgets#7".to_string(),
        source: github_client::Error::RateLimitExceeded,
    };

    assert_eq!(
        error.to_string(),
        "Failed to fetch status checks for octo-org/widgets#7"
    );
    assert_eq!(error.source().unwrap().to_string(), "Rate limit exceeded");
}

#[test]
fn test_action_error_message() {
    let error = BulldozerError::Action {
        action: "merge",
        pull_request: "octo-org/widgets#7".to_string(),
        source: github_client::Error::Conflict("Head branch was modified".to_string()),
    };

    assert_eq!(error.to_string(), "Failed to merge octo-org/widgets#7");
}
