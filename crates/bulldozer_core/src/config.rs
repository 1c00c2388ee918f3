//! Policy configuration model and parsing.
//!
//! A repository opts into bulldozer with a YAML policy file (by default
//! `.bulldozer.yml`) on its base branch:
//!
//! ```yaml
//! version: 1
//! merge:
//!   trigger:
//!     labels: ["merge when ready"]
//!   ignore:
//!     labels: ["do not merge"]
//!   method: squash
//!   options:
//!     squash:
//!       title: pull_request_title
//!       body: pull_request_body
//!       message_delimiter: "==COMMIT_MSG=="
//!   required_statuses: ["ci/build"]
//!   delete_after_merge: true
//! update:
//!   trigger:
//!     labels: ["update me"]
//!   required_statuses_description_whitelist:
//!     ci/build: ["flaky.*"]
//! ```
//!
//! Every regular expression in the file is compiled once, while parsing.

use github_client::models::MergeMethod;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::errors::ConfigurationError;

/// The only policy file version understood by this engine.
pub const SUPPORTED_VERSION: u32 = 1;

/// A compiled regular expression that remembers the pattern it was built from.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles an unanchored pattern.
    pub fn new(source: &str) -> Result<Self, ConfigurationError> {
        Self::compile(source, source)
    }

    /// Compiles a pattern that must match the whole input.
    pub fn anchored(source: &str) -> Result<Self, ConfigurationError> {
        Self::compile(source, &format!("^(?:{source})$"))
    }

    fn compile(source: &str, expression: &str) -> Result<Self, ConfigurationError> {
        let regex = Regex::new(expression).map_err(|e| ConfigurationError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the policy file.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Byte offset of the first match in `text`.
    pub fn find_start(&self, text: &str) -> Option<usize> {
        self.regex.find(text).map(|m| m.start())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.regex.as_str() == other.regex.as_str()
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

fn deserialize_anchored<'de, D>(deserializer: D) -> Result<Vec<Pattern>, D::Error>
where
    D: Deserializer<'de>,
{
    let sources = Vec::<String>::deserialize(deserializer)?;
    sources
        .iter()
        .map(|s| Pattern::anchored(s).map_err(serde::de::Error::custom))
        .collect()
}

/// An empty marker is the same as no marker.
fn deserialize_marker<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let marker = Option::<String>::deserialize(deserializer)?;
    Ok(marker.filter(|m| !m.is_empty()))
}

fn deserialize_marker_pattern<'de, D>(deserializer: D) -> Result<Option<Pattern>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_marker(deserializer)?
        .map(|source| Pattern::new(&source).map_err(serde::de::Error::custom))
        .transpose()
}

/// A set of rules that a pull request can match.
///
/// Used both as a trigger (whitelist) and as an ignore list (blacklist).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signals {
    /// Label names, compared case-insensitively
    #[serde(default)]
    pub labels: Vec<String>,
    /// Exact comment or review bodies, compared after trimming
    #[serde(default)]
    pub comments: Vec<String>,
    /// Substrings of comment or review bodies
    #[serde(default)]
    pub comment_substrings: Vec<String>,
    /// Substrings of the pull request description
    #[serde(default)]
    pub pr_body_substrings: Vec<String>,
    /// Base branch names
    #[serde(default)]
    pub branches: Vec<String>,
    /// Base branch patterns, matched against the whole branch name
    #[serde(default, deserialize_with = "deserialize_anchored")]
    pub branch_patterns: Vec<Pattern>,
}

impl Signals {
    /// A signal set is enabled when at least one rule is configured.
    pub fn enabled(&self) -> bool {
        !(self.labels.is_empty()
            && self.comments.is_empty()
            && self.comment_substrings.is_empty()
            && self.pr_body_substrings.is_empty()
            && self.branches.is_empty()
            && self.branch_patterns.is_empty())
    }

    /// Whether any rule needs the pull request's comments and reviews.
    pub fn uses_comments(&self) -> bool {
        !(self.comments.is_empty() && self.comment_substrings.is_empty())
    }
}

/// How the squash commit title is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStrategy {
    /// `<pull request title> (#<number>)`
    PullRequestTitle,
    /// First line of the first commit
    FirstCommitTitle,
    /// Whatever GitHub picks
    #[default]
    GithubDefaultTitle,
}

/// How the squash commit body is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyStrategy {
    /// The pull request description, optionally cut by a marker or delimiter
    PullRequestBody,
    /// One `* <title>` line per commit
    SummarizeCommits,
    #[default]
    EmptyBody,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SquashOptions {
    #[serde(default)]
    pub title: TitleStrategy,
    #[serde(default)]
    pub body: BodyStrategy,
    /// Keep only the text between the first two occurrences
    #[serde(default, deserialize_with = "deserialize_marker")]
    pub message_delimiter: Option<String>,
    /// Keep only the text before the first occurrence
    #[serde(default, deserialize_with = "deserialize_marker")]
    pub message_end_marker: Option<String>,
    /// Keep only the text before the first match
    #[serde(default, deserialize_with = "deserialize_marker_pattern")]
    pub message_end_marker_rx: Option<Pattern>,
}

impl SquashOptions {
    /// Names of the body truncation rules that are set.
    fn truncation_rules(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.message_end_marker_rx.is_some() {
            set.push("message_end_marker_rx");
        }
        if self.message_end_marker.is_some() {
            set.push("message_end_marker");
        }
        if self.message_delimiter.is_some() {
            set.push("message_delimiter");
        }
        set
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeOptions {
    #[serde(default)]
    pub squash: SquashOptions,
}

/// Rules for the merge axis.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default, alias = "whitelist")]
    pub trigger: Signals,
    #[serde(default, alias = "blacklist")]
    pub ignore: Signals,
    #[serde(default)]
    pub method: MergeMethod,
    #[serde(default)]
    pub options: MergeOptions,
    #[serde(default)]
    pub required_statuses: Vec<String>,
    #[serde(default)]
    pub delete_after_merge: bool,
}

/// Rules for the update axis.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Whether draft pull requests are kept up to date
    #[serde(default)]
    pub draft_update: bool,
    #[serde(default, alias = "whitelist")]
    pub trigger: Signals,
    #[serde(default, alias = "blacklist")]
    pub ignore: Signals,
    #[serde(default)]
    pub required_statuses: Vec<String>,
    /// Per status name, descriptions that make a failing status count as successful
    #[serde(default)]
    pub required_statuses_description_whitelist: HashMap<String, Vec<Pattern>>,
}

/// A validated policy document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    pub version: u32,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub update: UpdateConfig,
}

impl Configuration {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigurationError::UnsupportedVersion {
                version: self.version,
            });
        }

        let rules = self.merge.options.squash.truncation_rules();
        if rules.len() > 1 {
            return Err(ConfigurationError::ConflictingSquashMarkers { fields: rules });
        }

        Ok(())
    }

    /// Reads and validates a policy file from the local filesystem.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileAccessError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        parse_configuration(&text)
    }
}

/// Parses and validates a policy document.
pub fn parse_configuration(text: &str) -> Result<Configuration, ConfigurationError> {
    let config: Configuration = serde_yaml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
