//! GitHub App installation domain types.
//!
//! An installation binds the app to an account and the set of repositories it may act on.
//! The full-scan sweep enumerates installations, then the repositories of each one.

use serde::{Deserialize, Serialize};

use crate::models::Repository;

/// Represents a GitHub account (user or organization).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    /// The unique ID of the account
    pub id: u64,
    /// The login name of the account
    pub login: String,
    /// The type of account (User or Organization)
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Represents a GitHub App installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Installation {
    /// The unique ID of the installation
    pub id: u64,
    /// The account (user or organization) where the app is installed
    pub account: Account,
    /// `all` or `selected`
    pub repository_selection: Option<String>,
}

impl From<octocrab::models::Installation> for Installation {
    fn from(value: octocrab::models::Installation) -> Self {
        Self {
            id: *value.id,
            account: Account {
                id: *value.account.id,
                login: value.account.login,
                account_type: value.account.r#type,
            },
            repository_selection: value.repository_selection,
        }
    }
}

/// Response body of `GET /installation/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstallationRepositories {
    pub repositories: Vec<Repository>,
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
