//! Preference toggles.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use prefshare_core::api::{ApiClient, PreferenceField};
use prefshare_core::config::Config;
use prefshare_core::preferences::{PreferenceSync, SyncState, ToggleState};
use prefshare_core::session::Route;

async fn load_sync(client: &ApiClient) -> Result<PreferenceSync<'_>> {
    let session = super::require_session(Route::Preferences)?;
    let mut sync = PreferenceSync::new(client, session);
    if let SyncState::Error(message) = sync.load().await {
        bail!("{message}");
    }
    Ok(sync)
}

fn describe(state: &ToggleState) -> String {
    match state {
        ToggleState::Failed { message, .. } => {
            format!("{} (last change failed: {message})", on_off(state.shown()))
        }
        ToggleState::Confirmed(_) | ToggleState::PendingInput | ToggleState::Pending { .. } => {
            on_off(state.shown()).to_string()
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "On" } else { "Off" }
}

fn print_screen(sync: &PreferenceSync<'_>) {
    let Some(screen) = sync.screen() else {
        return;
    };
    let profile = &screen.profile;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Sharing", "Value"]);
    for (field, state) in screen.toggles() {
        let value = match field {
            PreferenceField::Email => profile.email.as_deref(),
            PreferenceField::Phone => profile.phone.as_deref(),
            PreferenceField::Address => profile.address.as_deref(),
        };
        table.add_row(vec![
            field.to_string(),
            describe(state),
            value.unwrap_or("-").to_string(),
        ]);
    }
    println!("{table}");
}

pub async fn show(config: &Config) -> Result<()> {
    let client = super::client(config)?;
    let sync = load_sync(&client).await?;
    print_screen(&sync);
    Ok(())
}

fn prompt(field: PreferenceField) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "Enter your {field} (empty to cancel): ").context("write prompt")?;
    stdout.flush().context("flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read value from stdin")?;
    Ok(line.trim().to_string())
}

pub async fn enable(config: &Config, field: PreferenceField, value: Option<&str>) -> Result<()> {
    let client = super::client(config)?;
    let mut sync = load_sync(&client).await?;
    sync.begin_enable(field)?;

    // Only an empty prompt line cancels; an explicit --value is always validated.
    let value = match value {
        Some(v) => v.to_string(),
        None => {
            let typed = prompt(field)?;
            if typed.is_empty() {
                sync.cancel(field);
                println!("Cancelled; {field} is not shared.");
                return Ok(());
            }
            typed
        }
    };

    sync.submit_value(field, &value).await?;
    println!("Now sharing {field}.");
    print_screen(&sync);
    Ok(())
}

pub async fn disable(config: &Config, field: PreferenceField) -> Result<()> {
    let client = super::client(config)?;
    let mut sync = load_sync(&client).await?;
    sync.disable(field).await?;
    println!("Stopped sharing {field}.");
    print_screen(&sync);
    Ok(())
}
