//! User account commands.

use anyhow::Result;
use prefshare_core::account;
use prefshare_core::api::{Availability, UserSignup};
use prefshare_core::config::Config;
use prefshare_core::credentials::{CredentialStore, Role};

pub async fn signup(config: &Config, form: UserSignup) -> Result<()> {
    let client = super::client(config)?;
    let mut store = CredentialStore::load();
    let next = account::signup_user(&client, &mut store, &form).await?;
    println!("Signed up as {}. Next: {next}", form.username.trim());
    Ok(())
}

pub async fn login(config: &Config, username: &str, password: &str) -> Result<()> {
    let client = super::client(config)?;
    let mut store = CredentialStore::load();
    let next = account::login_user(&client, &mut store, username, password).await?;
    println!("Logged in as {}. Next: {next}", username.trim());
    Ok(())
}

pub fn logout(admin: bool) -> Result<()> {
    let role = if admin { Role::Admin } else { Role::User };
    let mut store = CredentialStore::load();
    if account::logout(&mut store, role)? {
        println!("Logged out ({}).", role.label());
    } else {
        println!("No {} token stored.", role.label());
    }
    Ok(())
}

pub async fn check_username(config: &Config, username: &str, admin: bool) -> Result<()> {
    let role = if admin { Role::Admin } else { Role::User };
    let client = super::client(config)?;
    match account::check_username(&client, role, username).await? {
        Some(Availability::Available) => println!("Username is available!"),
        Some(Availability::Taken) => match role {
            Role::User => println!("Username is already taken!"),
            Role::Admin => println!("Username is not available!"),
        },
        None => println!("Username is required!"),
    }
    Ok(())
}
