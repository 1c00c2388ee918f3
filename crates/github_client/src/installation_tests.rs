use super::*;
use serde_json::{from_str, to_string};

#[test]
fn test_account_deserialization() {
    let json_str = r#"{
        "id": 67890,
        "login": "user-account",
        "type": "User",
        "node_id": "MDQ6VXNlcjY3ODkw"
    }"#;

    let account: Account = from_str(json_str).expect("Failed to deserialize Account");

    assert_eq!(account.id, 67890);
    assert_eq!(account.login, "user-account");
    assert_eq!(account.account_type, "User");
}

#[test]
fn test_installation_serialization() {
    let installation = Installation {
        id: 98765,
        account: Account {
            id: 12345,
            login: "test-org".to_string(),
            account_type: "Organization".to_string(),
        },
        repository_selection: Some("selected".to_string()),
    };

    let json_str = to_string(&installation).expect("Failed to serialize Installation");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Failed to parse JSON");

    assert_eq!(parsed["id"], 98765);
    assert_eq!(parsed["account"]["login"], "test-org");
    assert_eq!(parsed["account"]["type"], "Organization");
    assert_eq!(parsed["repository_selection"], "selected");
}

#[test]
fn test_installation_repositories_deserialization() {
    let json_str = r#"{
        "total_count": 2,
        "repositories": [
            {
                "name": "widgets",
                "full_name": "octo-org/widgets",
                "owner": { "login": "octo-org" },
                "archived": false
            },
            {
                "name": "gadgets",
                "full_name": "octo-org/gadgets",
                "owner": { "login": "octo-org" },
                "archived": true
            }
        ]
    }"#;

    let response: InstallationRepositories = from_str(json_str).unwrap();

    assert_eq!(response.repositories.len(), 2);
    assert_eq!(response.repositories[0].full_name(), "octo-org/widgets");
    assert!(response.repositories[1].is_archived());
}
