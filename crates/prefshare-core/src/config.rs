//! Configuration management for prefshare.
//!
//! Loads configuration from ${PREFSHARE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default host for signup, login and the admin user list.
pub const DEFAULT_API_URL: &str = "https://psbackend-cyk4.onrender.com";
/// Default host for profile, field updates and audit data.
pub const DEFAULT_PROFILE_URL: &str = "https://intern-task-h2vr.onrender.com";
/// Default IP geolocation service.
pub const DEFAULT_GEO_URL: &str = "https://freeipapi.com";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present,
/// while the user's customized values are preserved.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    // Template is the base
    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    // User values win over template defaults
    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                // Scalar: override
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    // Section the template doesn't know about (e.g. from a newer build)
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                // Replaced wholesale
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for prefshare configuration and data directories.
    //!
    //! PREFSHARE_HOME resolution order:
    //! 1. PREFSHARE_HOME environment variable (if set)
    //! 2. ~/.config/prefshare (default)
    //! 3. ./.prefshare when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the prefshare home directory.
    pub fn prefshare_home() -> PathBuf {
        if let Ok(home) = std::env::var("PREFSHARE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".prefshare"),
            |h| h.join(".config").join("prefshare"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        prefshare_home().join("config.toml")
    }
}

/// Which configured URL a value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKey {
    Api,
    Profile,
    Geo,
}

impl UrlKey {
    fn env_var(self) -> &'static str {
        match self {
            UrlKey::Api => "PREFSHARE_API_URL",
            UrlKey::Profile => "PREFSHARE_PROFILE_URL",
            UrlKey::Geo => "PREFSHARE_GEO_URL",
        }
    }

    fn default_url(self) -> &'static str {
        match self {
            UrlKey::Api => DEFAULT_API_URL,
            UrlKey::Profile => DEFAULT_PROFILE_URL,
            UrlKey::Geo => DEFAULT_GEO_URL,
        }
    }

    /// Table and key of this URL inside config.toml.
    fn toml_location(self) -> (&'static str, &'static str) {
        match self {
            UrlKey::Api => ("backend", "api_url"),
            UrlKey::Profile => ("backend", "profile_url"),
            UrlKey::Geo => ("geo", "base_url"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UrlKey::Api => "api",
            UrlKey::Profile => "profile",
            UrlKey::Geo => "geo",
        }
    }
}

impl std::str::FromStr for UrlKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "api" => Ok(UrlKey::Api),
            "profile" => Ok(UrlKey::Profile),
            "geo" => Ok(UrlKey::Geo),
            _ => Err(format!("Unknown URL key: {value} (expected api, profile or geo)")),
        }
    }
}

/// Backend hosts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub api_url: Option<String>,
    pub profile_url: Option<String>,
}

/// IP geolocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub base_url: Option<String>,
    /// Parallel lookups when building the location breakdown (min 1).
    pub concurrency: usize,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            concurrency: Config::DEFAULT_GEO_CONCURRENCY,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout for each HTTP request in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Optional log file path
    pub log_file: Option<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub geo: GeoConfig,
}

impl Config {
    const DEFAULT_GEO_CONCURRENCY: usize = 4;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the configured value for a URL, ignoring blank strings.
    pub fn configured_url(&self, key: UrlKey) -> Option<&str> {
        let raw = match key {
            UrlKey::Api => self.backend.api_url.as_deref(),
            UrlKey::Profile => self.backend.profile_url.as_deref(),
            UrlKey::Geo => self.geo.base_url.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    /// Resolves a URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the env or config value is not a valid URL.
    pub fn resolve_url(&self, key: UrlKey) -> Result<String> {
        if let Ok(env_url) = std::env::var(key.env_var()) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed, key)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        if let Some(config_url) = self.configured_url(key) {
            validate_url(config_url, key)?;
            return Ok(config_url.trim_end_matches('/').to_string());
        }

        Ok(key.default_url().to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Worker count for location lookups, never below one.
    pub fn geo_concurrency(&self) -> usize {
        self.geo.concurrency.max(1)
    }

    /// Saves one URL to the config file.
    ///
    /// Creates the file if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    pub fn save_url(key: UrlKey, url: &str) -> Result<()> {
        Self::save_url_to(&paths::config_path(), key, url)
    }

    /// Saves one URL to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_url_to(path: &Path, key: UrlKey, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, Item, Table, value};

        let trimmed = url.trim();
        validate_url(trimmed, key)?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let (table, field) = key.toml_location();
        if !doc.contains_table(table) {
            doc[table] = Item::Table(Table::new());
        }
        doc[table][field] = value(trimmed);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        // Write next to the target, then rename over it
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: 0,
            log_file: None,
            backend: BackendConfig::default(),
            geo: GeoConfig::default(),
        }
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str, key: UrlKey) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {} URL: {url}", key.label()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.request_timeout_secs, 0);
        assert_eq!(config.geo.concurrency, 4);
        assert!(config.backend.api_url.is_none());
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "request_timeout_secs = 15\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.geo.concurrency, 4);
    }

    #[test]
    fn test_init_creates_config_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Prefshare Configuration"));
        assert!(contents.contains("# api_url ="));

        // The template itself must parse into defaults.
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.geo_concurrency(), 4);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_timeout_zero_disables() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_geo_concurrency_floor_is_one() {
        let config = Config {
            geo: GeoConfig {
                concurrency: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.geo_concurrency(), 1);
    }

    #[test]
    fn test_configured_url_blank_is_none() {
        let config = Config {
            backend: BackendConfig {
                api_url: Some("   ".to_string()),
                profile_url: None,
            },
            ..Default::default()
        };
        assert_eq!(config.configured_url(UrlKey::Api), None);
    }

    #[test]
    fn test_resolve_url_uses_config_and_strips_trailing_slash() {
        let config = Config {
            geo: GeoConfig {
                base_url: Some("https://geo.example.com/".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.resolve_url(UrlKey::Geo).unwrap(),
            "https://geo.example.com"
        );
    }

    #[test]
    fn test_resolve_url_rejects_invalid_config_value() {
        let config = Config {
            backend: BackendConfig {
                api_url: None,
                profile_url: Some("not a url".to_string()),
            },
            ..Default::default()
        };
        assert!(config.resolve_url(UrlKey::Profile).is_err());
    }

    #[test]
    fn test_save_url_preserves_other_fields_and_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "request_timeout_secs = 30\n[geo]\nconcurrency = 2\n",
        )
        .unwrap();

        Config::save_url_to(&config_path, UrlKey::Api, "https://api.example.com").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.backend.api_url.as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.geo.concurrency, 2);

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Prefshare Configuration"));
    }

    #[test]
    fn test_save_url_rejects_invalid_url() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::save_url_to(&config_path, UrlKey::Geo, "nope").is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_url_key_from_str() {
        assert_eq!("API".parse::<UrlKey>().unwrap(), UrlKey::Api);
        assert_eq!("profile".parse::<UrlKey>().unwrap(), UrlKey::Profile);
        assert!("other".parse::<UrlKey>().is_err());
    }
}
