//! # API Key Store
//!
//! The server is protected by a single shared secret read from
//! `<keys_dir>/<key_name>.txt`. The key is read once and cached for the
//! lifetime of the process.
//!
//! ## Policy:
//! - File present: its trimmed content is the key; requests must supply it.
//! - File missing: the deployment opted out, authentication is disabled.
//! - File unreadable for any other reason: the error is reported and the
//!   read is retried on the next request.

use once_cell::sync::OnceCell;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Lazily loaded, read-once API key.
///
/// ## Rust Concepts:
/// - **OnceCell::get_or_try_init**: the first successful read is stored and
///   every later call borrows it. A failed read stores nothing, so the next
///   request tries again.
/// - **&str return**: callers borrow the cached key instead of cloning it
///   on every request.
#[derive(Debug)]
pub struct ApiKeyStore {
    path: PathBuf,
    key: OnceCell<String>,
}

impl ApiKeyStore {
    /// `path` is the key file, see [`crate::config::AuthConfig::key_path`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: OnceCell::new(),
        }
    }

    /// Return the configured key, reading the key file on first use.
    ///
    /// An empty string means authentication is disabled.
    pub fn read_key(&self) -> io::Result<&str> {
        self.key
            .get_or_try_init(|| load_key(&self.path))
            .map(String::as_str)
    }

    /// Whether a non-empty key is configured.
    pub fn is_enabled(&self) -> io::Result<bool> {
        Ok(!self.read_key()?.is_empty())
    }

    /// Check a client-supplied key. Always true when authentication is
    /// disabled.
    pub fn verify(&self, supplied: Option<&str>) -> io::Result<bool> {
        let key = self.read_key()?;
        Ok(key.is_empty() || supplied == Some(key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_key(path: &Path) -> io::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            info!(path = %path.display(), "API key loaded, authentication enabled");
            Ok(contents.trim().to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "No API key file found, authentication disabled");
            Ok(String::new())
        }
        Err(e) => Err(e),
    }
}
