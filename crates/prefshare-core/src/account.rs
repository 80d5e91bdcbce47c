//! Signup, login and logout for both roles.

use crate::api::{ApiClient, Availability, UserSignup};
use crate::credentials::{CredentialStore, Role};
use crate::error::FlowError;
use crate::session::Route;

/// Minimum user password length.
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_login(username: &str, password: &str) -> Result<(), FlowError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(FlowError::invalid("Username and password are required!"));
    }
    Ok(())
}

pub fn validate_user_signup(form: &UserSignup) -> Result<(), FlowError> {
    if form.username.trim().is_empty() {
        return Err(FlowError::invalid("Username is required!"));
    }
    if form.password != form.password_confirm {
        return Err(FlowError::invalid("Passwords do not match"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FlowError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_admin_signup(
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<(), FlowError> {
    if username.trim().is_empty() {
        return Err(FlowError::invalid("Username is required!"));
    }
    if password.is_empty() || password_confirm.is_empty() {
        return Err(FlowError::invalid("Password and confirmation are required!"));
    }
    if password != password_confirm {
        return Err(FlowError::invalid("Passwords do not match!"));
    }
    Ok(())
}

/// Checks username availability. Blank names are not sent and yield `None`.
pub async fn check_username(
    client: &ApiClient,
    role: Role,
    username: &str,
) -> Result<Option<Availability>, FlowError> {
    let username = username.trim();
    if username.is_empty() {
        return Ok(None);
    }
    client
        .check_username(role, username)
        .await
        .map(Some)
        .map_err(|err| {
            tracing::warn!(role = role.label(), error = %err, "username check failed");
            FlowError::invalid("Error checking username!")
        })
}

async fn require_available(
    client: &ApiClient,
    role: Role,
    username: &str,
    taken_message: &str,
) -> Result<(), FlowError> {
    match check_username(client, role, username).await? {
        Some(Availability::Available) => Ok(()),
        Some(Availability::Taken) | None => Err(FlowError::invalid(taken_message)),
    }
}

fn persist(store: &mut CredentialStore, role: Role, token: &str) -> Result<(), FlowError> {
    store.save_token(role, token).map_err(FlowError::Storage)
}

/// Logs an end user in; on success the token is stored and the overview is next.
pub async fn login_user(
    client: &ApiClient,
    store: &mut CredentialStore,
    username: &str,
    password: &str,
) -> Result<Route, FlowError> {
    validate_login(username, password)?;
    let token = client.login_user(username.trim(), password).await?;
    persist(store, Role::User, &token)?;
    tracing::info!(username = username.trim(), "user logged in");
    Ok(Route::Overview)
}

/// Signs an end user up; on success the token is stored and the overview is next.
pub async fn signup_user(
    client: &ApiClient,
    store: &mut CredentialStore,
    form: &UserSignup,
) -> Result<Route, FlowError> {
    validate_user_signup(form)?;
    require_available(client, Role::User, &form.username, "Username is already taken!").await?;
    let token = client.signup_user(form).await?;
    persist(store, Role::User, &token)?;
    tracing::info!(username = %form.username, "user signed up");
    Ok(Route::Overview)
}

/// Logs an admin in; on success the token is stored and the dashboard is next.
pub async fn login_admin(
    client: &ApiClient,
    store: &mut CredentialStore,
    username: &str,
    password: &str,
) -> Result<Route, FlowError> {
    validate_login(username, password)?;
    let token = client.login_admin(username.trim(), password).await?;
    persist(store, Role::Admin, &token)?;
    tracing::info!(username = username.trim(), "admin logged in");
    Ok(Route::AdminDashboard)
}

/// Signs an admin up. A returned token is stored; the admin login is next.
pub async fn signup_admin(
    client: &ApiClient,
    store: &mut CredentialStore,
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<Route, FlowError> {
    validate_admin_signup(username, password, password_confirm)?;
    require_available(client, Role::Admin, username, "Username is not available!").await?;
    let token = client
        .signup_admin(username.trim(), password, password_confirm)
        .await?;
    if let Some(token) = token {
        persist(store, Role::Admin, &token)?;
    }
    tracing::info!(username = username.trim(), "admin signed up");
    Ok(Route::AdminLogin)
}

/// Forgets a role's token. Returns whether one was stored.
pub fn logout(store: &mut CredentialStore, role: Role) -> Result<bool, FlowError> {
    store.clear(role).map_err(FlowError::Storage)
}
