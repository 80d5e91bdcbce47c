//! Admin commands.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use prefshare_core::account;
use prefshare_core::admin::{self, Dashboard};
use prefshare_core::api::{Permissions, PreferenceField};
use prefshare_core::config::Config;
use prefshare_core::credentials::CredentialStore;
use prefshare_core::geo::GeoLocator;
use prefshare_core::session::Route;

pub async fn signup(
    config: &Config,
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<()> {
    let client = super::client(config)?;
    let mut store = CredentialStore::load();
    let next =
        account::signup_admin(&client, &mut store, username, password, password_confirm).await?;
    println!("Admin {} created. Next: {next}", username.trim());
    Ok(())
}

pub async fn login(config: &Config, username: &str, password: &str) -> Result<()> {
    let client = super::client(config)?;
    let mut store = CredentialStore::load();
    let next = account::login_admin(&client, &mut store, username, password).await?;
    println!("Logged in as admin {}. Next: {next}", username.trim());
    Ok(())
}

pub async fn dashboard(config: &Config) -> Result<()> {
    let session = super::require_session(Route::AdminDashboard)?;
    let client = super::client(config)?;
    let geo = GeoLocator::from_config(config, client.http().clone())
        .context("build geolocation client")?;

    let dashboard =
        admin::load_dashboard(&client, &geo, &session, config.geo_concurrency()).await;
    render(&dashboard);
    Ok(())
}

fn or_na(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("N/A")
        .to_string()
}

/// Fields the user shares, e.g. `email, phone`.
fn sharing(perms: Permissions) -> String {
    let shared: Vec<&str> = PreferenceField::all()
        .iter()
        .filter(|f| perms.get(**f))
        .map(|f| f.as_str())
        .collect();
    if shared.is_empty() {
        "none".to_string()
    } else {
        shared.join(", ")
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn render(dashboard: &Dashboard) {
    for warning in &dashboard.warnings {
        eprintln!("warning: {warning}");
    }

    println!("Users ({})", dashboard.users.len());
    let mut users = new_table(vec![
        "Username", "Name", "Email", "Phone", "Address", "Sharing",
    ]);
    for row in &dashboard.users {
        let record = &row.record;
        users.add_row(vec![
            row.username.clone(),
            or_na(record.name.as_deref()),
            or_na(record.email.as_deref()),
            or_na(record.phone.as_deref()),
            or_na(record.address.as_deref()),
            sharing(record.permissions),
        ]);
    }
    println!("{users}\n");

    println!("Audit log ({})", dashboard.audit_logs.len());
    let mut logs = new_table(vec!["When", "User", "Action", "Field", "IP", "City"]);
    for row in &dashboard.audit_logs {
        let when = row.record.parsed_timestamp().map_or_else(
            || row.record.timestamp.clone().unwrap_or_default(),
            |ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        logs.add_row(vec![
            when,
            row.username.clone(),
            row.record.action.clone().unwrap_or_default(),
            row.record.field.clone().unwrap_or_default(),
            row.record.ip_address.clone().unwrap_or_default(),
            row.city.clone(),
        ]);
    }
    println!("{logs}\n");

    println!("Locations ({} IPs)", dashboard.locations.total());
    let mut locations = new_table(vec!["City", "Users", "Share"]);
    for (city, count) in dashboard.locations.iter() {
        locations.add_row(vec![
            city.to_string(),
            count.to_string(),
            format!("{:.1}%", dashboard.locations.share(city) * 100.0),
        ]);
    }
    println!("{locations}");
}
