use anyhow::Result;
use comfy_table::Table;
use prefshare_core::config::Config;
use prefshare_core::overview;
use prefshare_core::session::Route;

pub async fn show(config: &Config) -> Result<()> {
    let session = super::require_session(Route::Overview)?;
    let client = super::client(config)?;
    let summary = overview::load_overview(&client, &session).await?;

    if let Some(name) = summary
        .profile
        .name
        .as_deref()
        .or(summary.profile.username.as_deref())
    {
        println!("Signed in as {name}");
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Permission"]);
    for (field, grant) in &summary.grants {
        table.add_row(vec![field.to_string(), grant.to_string()]);
    }
    println!("{table}");
    Ok(())
}
