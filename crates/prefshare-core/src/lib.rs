//! Core prefshare library (config, credentials, API client, flows).

pub mod account;
pub mod admin;
pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod geo;
pub mod logging;
pub mod overview;
pub mod preferences;
pub mod session;
