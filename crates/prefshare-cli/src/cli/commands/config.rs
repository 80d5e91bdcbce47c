//! Config command handlers.

use anyhow::{Context, Result};
use prefshare_core::config::{self, UrlKey};

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set_url(key: UrlKey, url: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::save_url_to(&config_path, key, url)
        .with_context(|| format!("update config at {}", config_path.display()))?;
    println!("Set {} URL to {} in {}", key.label(), url.trim(), config_path.display());
    Ok(())
}
