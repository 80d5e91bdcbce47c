//! CLI command handlers.

pub mod account;
pub mod admin;
pub mod config;
pub mod overview;
pub mod preferences;

use anyhow::{Context, Result, bail};
use prefshare_core::api::ApiClient;
use prefshare_core::config::Config;
use prefshare_core::credentials::CredentialStore;
use prefshare_core::session::{self, Resolution, Route, Session};

fn client(config: &Config) -> Result<ApiClient> {
    ApiClient::from_config(config).context("build API client")
}

/// Resolves the session for a protected route, or fails with the route to
/// visit instead. Nothing is fetched on failure.
fn require_session(route: Route) -> Result<Session> {
    let store = CredentialStore::load();
    match session::resolve(&store, route) {
        Resolution::Proceed(Some(session)) => Ok(session),
        Resolution::Redirect(target) => bail!("Not logged in. Visit {target}"),
        Resolution::Proceed(None) => bail!("{route} does not take a session"),
    }
}
