//! Dotenv-style key-value store upsert.
//!
//! Rewrites exactly one `KEY="value"` assignment in a plain-text store file
//! and leaves every other byte of the file untouched.
//!
//! Matching rule (explicit, unit-tested):
//! - A line matches when it starts with `KEY="` and the value runs up to the
//!   next `"` on that line (pattern `^KEY="[^"]*"`, multi-line anchored).
//! - Only the first match is rewritten; anything after the closing quote on
//!   that line, and all other lines, are preserved byte-for-byte.
//! - No match: `\nKEY="value"` is appended to the content.
//!
//! Notes:
//! - Values must not contain a `"` character; the `[^"]*` value class cannot
//!   represent embedded quotes and the store format defines no escaping.
//! - The write is a full overwrite with no locking and no atomic rename;
//!   concurrent writers can race. Acceptable for a single-operator
//!   scheduled-task setup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Error type for store access and rewrite
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file not found: {0}")]
    NotFound(PathBuf),

    #[error("store i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("store is not valid utf-8 text: {0}")]
    NotUtf8(PathBuf),
}

/// Policy for a missing store file.
///
/// The store normally pre-exists with other required keys, so `Fail` is the
/// default; `Create` treats missing content as empty and writes a fresh file
/// containing only the new assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingStorePolicy {
    /// Missing store file is an error (default)
    #[default]
    Fail,
    /// Missing store file is treated as an empty store
    Create,
}

/// Handle to one store file
#[derive(Clone, Debug)]
pub struct EnvStore {
    path: PathBuf,
    missing: MissingStorePolicy,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            missing: MissingStorePolicy::Fail,
        }
    }

    /// Configure what to do when the store file does not exist
    pub fn with_missing_policy(mut self, missing: MissingStorePolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert one `KEY="value"` assignment and write the store back in full.
    pub fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let content = match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map_err(|_| StoreError::NotUtf8(self.path.clone()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => match self.missing {
                MissingStorePolicy::Fail => {
                    return Err(StoreError::NotFound(self.path.clone()))
                }
                MissingStorePolicy::Create => String::new(),
            },
            Err(e) => return Err(StoreError::Io(e)),
        };

        let updated = upsert_assignment(&content, key, value);
        fs::write(&self.path, updated)?;
        debug!(path = %self.path.display(), key, "store updated");
        Ok(())
    }
}

/// Pure content transform: replace the first `KEY="..."` value, or append
/// a new assignment when the key is absent.
pub fn upsert_assignment(content: &str, key: &str, value: &str) -> String {
    let pattern = format!(r#"(?m)^{}="[^"]*""#, regex::escape(key));
    let re = Regex::new(&pattern).expect("escaped key pattern must compile");

    if re.is_match(content) {
        // First match only; the replacement closure sidesteps `$` expansion
        // in the value.
        re.replace(content, |_: &regex::Captures<'_>| {
            format!("{key}=\"{value}\"")
        })
        .into_owned()
    } else if content.is_empty() {
        format!("{key}=\"{value}\"")
    } else {
        format!("{content}\n{key}=\"{value}\"")
    }
}
