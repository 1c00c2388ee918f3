//! Resolution of the effective policy for a repository.
//!
//! The policy file is read from the repository at the ref under evaluation. When it is
//! absent or cannot be parsed, the operator's fallback configuration (if any) applies.
//! Only transport failures other than "not found" are reported as errors.

use github_client::PullRequestClient;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::{parse_configuration, Configuration};
use crate::errors::{BulldozerError, ConfigurationError};

/// Default location of the policy file inside a repository.
pub const DEFAULT_CONFIG_PATH: &str = ".bulldozer.yml";

/// The state of a repository's policy.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigState {
    /// No policy file and no fallback
    Missing,
    /// A policy applies
    Valid(Arc<Configuration>),
    /// The policy file is broken and there is no fallback
    Invalid(ConfigurationError),
}

/// A policy resolved for one repository and ref.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedConfiguration {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub state: ConfigState,
}

impl FetchedConfiguration {
    /// The configuration, when one applies.
    pub fn config(&self) -> Option<&Configuration> {
        match &self.state {
            ConfigState::Valid(config) => Some(config),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.state, ConfigState::Missing)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.state, ConfigState::Invalid(_))
    }
}

/// Reads repository policy files and applies the fallback chain.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_path: String,
    default_config: Option<Arc<Configuration>>,
}

impl ConfigResolver {
    pub fn new(config_path: impl Into<String>, default_config: Option<Configuration>) -> Self {
        Self {
            config_path: config_path.into(),
            default_config: default_config.map(Arc::new),
        }
    }

    /// Resolves the policy for `owner/repo` at `reference`.
    #[instrument(skip(self, client), fields(path = %self.config_path))]
    pub async fn resolve(
        &self,
        client: &dyn PullRequestClient,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<FetchedConfiguration, BulldozerError> {
        let content = client
            .get_file_content(owner, repo, &self.config_path, reference)
            .await
            .map_err(|source| BulldozerError::ConfigTransport {
                owner: owner.to_string(),
                repo: repo.to_string(),
                reference: reference.to_string(),
                source,
            })?;

        let state = match content {
            None => {
                debug!("No policy file found");
                self.fallback_or(ConfigState::Missing)
            }
            Some(text) => match parse_configuration(&text) {
                Ok(config) => ConfigState::Valid(Arc::new(config)),
                Err(e) => {
                    warn!(error = %e, "Policy file is invalid");
                    self.fallback_or(ConfigState::Invalid(e))
                }
            },
        };

        Ok(FetchedConfiguration {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
            state,
        })
    }

    fn fallback_or(&self, state: ConfigState) -> ConfigState {
        match &self.default_config {
            Some(config) => {
                debug!("Using fallback configuration");
                ConfigState::Valid(config.clone())
            }
            None => state,
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH, None)
    }
}

#[cfg(test)]
#[path = "config_resolver_tests.rs"]
mod tests;
