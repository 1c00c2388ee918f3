//! Repository contents domain types.
//!
//! The policy engine reads exactly one kind of content: a single file at a ref. The
//! Contents API returns it base64 encoded, wrapped with line breaks every 60 characters.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Type of entry returned by the Contents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Regular file
    File,

    /// Directory (can contain other entries)
    Dir,

    /// Symbolic link
    Symlink,

    /// Git submodule reference
    Submodule,
}

/// A single file returned by `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Entry type; anything other than `file` has no content to decode
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Full path within repository
    pub path: String,

    /// Content encoding, `base64` for files below the API size limit
    #[serde(default)]
    pub encoding: Option<String>,

    /// Encoded file content
    #[serde(default)]
    pub content: Option<String>,
}

impl FileContent {
    /// Decodes the file body into UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResponse` when the entry is not a base64 encoded file or the
    /// decoded bytes are not UTF-8.
    pub fn decode(&self) -> Result<String, Error> {
        if self.entry_type != EntryType::File {
            return Err(Error::InvalidResponse);
        }

        match self.encoding.as_deref() {
            Some("base64") => {}
            _ => return Err(Error::InvalidResponse),
        }

        let encoded: String = self
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| Error::InvalidResponse)?;

        String::from_utf8(bytes).map_err(|_| Error::InvalidResponse)
    }
}

#[cfg(test)]
#[path = "contents_tests.rs"]
mod tests;
