//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Callers in the policy engine rely on the distinction
//! between [`Error::NotFound`] and the other variants: a missing resource is frequently an
//! expected outcome (no policy file, unprotected branch) rather than a failure.

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_pull_request("octo-org", "widgets", 42).await {
///     Ok(pr) => println!("Pull request is {}", pr.state),
///     Err(Error::NotFound) => eprintln!("No such pull request"),
///     Err(Error::RateLimitExceeded) => eprintln!("Rate limit exceeded, retry later"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API request failed.
    ///
    /// The contained string carries the message GitHub returned, or a description of the
    /// transport failure.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - GitHub App credentials are invalid or expired
    /// - An installation token could not be minted
    /// - The private key could not be parsed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    ///
    /// This error occurs when a GitHub API request returns a 404 status code,
    /// indicating that the requested resource (repository, file, branch protection, etc.)
    /// does not exist or is not accessible with the current authentication.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// GitHub refused the operation because of the current state of the resource.
    ///
    /// Returned for merge attempts on pull requests that are not mergeable (405) or whose
    /// head moved since it was read (409).
    #[error("Operation rejected by GitHub: {0}")]
    Conflict(String),
}

impl Error {
    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
