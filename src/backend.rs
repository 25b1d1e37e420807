//! Credential backend abstraction.
//!
//! The backend owns stored site entries and reports whether it is reachable
//! and unlocked. Connection handling, key exchange and message framing live
//! behind this trait; the decision layer only consumes its answers.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Availability of the credential backend for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// The backend answered and is configured for this browser.
    pub reachable: bool,
    /// The backend answered but its credential store is locked.
    pub locked: bool,
    /// A newer backend release is available.
    #[serde(default)]
    pub update_available: bool,
}

impl BackendStatus {
    /// Reachable and unlocked.
    pub fn ready() -> Self {
        Self {
            reachable: true,
            locked: false,
            update_available: false,
        }
    }

    pub fn locked() -> Self {
        Self {
            reachable: true,
            locked: true,
            update_available: false,
        }
    }

    /// Not reachable or not configured. Also used when the status query fails.
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_update_available(mut self, update_available: bool) -> Self {
        self.update_available = update_available;
        self
    }

    /// Whether credentials could be retrieved right now.
    pub fn is_unlocked(&self) -> bool {
        self.reachable && !self.locked
    }
}

/// A stored site entry as supplied by the backend.
#[derive(Debug)]
pub struct SiteEntry {
    /// Display name of the entry.
    pub name: String,
    pub login: String,
    pub password: SecretString,
    /// Site pattern this entry is authorized for. See [`crate::site::SitePattern`].
    pub url: String,
}

impl SiteEntry {
    pub fn new(
        name: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            login: login.into(),
            password: SecretString::from(password.into()),
            url: url.into(),
        }
    }
}

/// Source of backend status and stored site entries.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Query reachability, lock state and update availability.
    ///
    /// Callers treat `Err` as unreachable.
    async fn status(&self) -> Result<BackendStatus>;

    /// Stored entries that may apply to the normalized page URL.
    ///
    /// The backend may over-approximate (e.g. return everything for the
    /// origin); every entry is still checked against its site pattern.
    async fn entries_for(&self, page_url: &str) -> Result<Vec<SiteEntry>>;
}
