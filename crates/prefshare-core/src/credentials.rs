//! Bearer token storage and retrieval.
//!
//! Stores tokens in `<base>/credentials.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Credential cache filename.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Key holding the end-user token.
pub const USER_TOKEN_KEY: &str = "jwt";
/// Older key for the end-user token, read as a fallback.
pub const LEGACY_USER_TOKEN_KEY: &str = "userToken";
/// Key holding the admin token.
pub const ADMIN_TOKEN_KEY: &str = "adminToken";

/// Account role a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Key the role's token is written under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Role::User => USER_TOKEN_KEY,
            Role::Admin => ADMIN_TOKEN_KEY,
        }
    }

    /// Keys checked, in order, when reading the role's token.
    fn lookup_keys(self) -> &'static [&'static str] {
        match self {
            Role::User => &[USER_TOKEN_KEY, LEGACY_USER_TOKEN_KEY],
            Role::Admin => &[ADMIN_TOKEN_KEY],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Shows the first few characters of a token for diagnostics.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}

/// Persistent key-value token cache.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(flatten)]
    tokens: BTreeMap<String, String>,

    #[serde(skip)]
    path: PathBuf,
}

impl CredentialStore {
    /// Returns the path to the default credentials file.
    pub fn default_path() -> PathBuf {
        paths::prefshare_home().join(CREDENTIALS_FILE)
    }

    /// Loads the store from the default path.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Loads the store from disk.
    ///
    /// A missing, unreadable or corrupt file yields an empty store: every
    /// role reads as logged out rather than failing the caller.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "credential store unreadable; treating as empty");
                Self {
                    tokens: BTreeMap::new(),
                    path: path.to_path_buf(),
                }
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let mut store = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
            serde_json::from_str::<Self>(&contents)
                .with_context(|| format!("Failed to parse credentials from {}", path.display()))?
        } else {
            Self::default()
        };
        store.path = path.to_path_buf();
        Ok(store)
    }

    /// Path this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves the store to disk with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize credentials")?;

        // Tokens are secrets: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        // No mode bits here; rely on the profile directory's ACL
        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }

    /// Gets the token stored under a key. Blank values read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tokens
            .get(key)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Sets the token for a key (in memory; call `save` to persist).
    pub fn set(&mut self, key: &str, token: &str) {
        self.tokens.insert(key.to_string(), token.trim().to_string());
    }

    /// Removes the token for a key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.tokens.remove(key)
    }

    /// Returns the token for a role, if any.
    pub fn token_for(&self, role: Role) -> Option<&str> {
        role.lookup_keys().iter().find_map(|key| self.get(key))
    }

    /// Stores and persists a role's token.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn save_token(&mut self, role: Role, token: &str) -> Result<()> {
        self.set(role.storage_key(), token);
        self.save()?;
        tracing::debug!(role = role.label(), token = %mask_token(token), "stored token");
        Ok(())
    }

    /// Removes and persists the absence of a role's token.
    /// Returns whether anything was removed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn clear(&mut self, role: Role) -> Result<bool> {
        let mut removed = false;
        for key in role.lookup_keys() {
            removed |= self.remove(key).is_some();
        }
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}
