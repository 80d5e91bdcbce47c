//! HTTP client for the preference sharing backend.
//!
//! The backend does not signal success uniformly: some endpoints put
//! `status: "success"` in the body, others rely on the HTTP status. Each
//! endpoint's convention lives in the [`Endpoint`] table and every call is
//! normalized into [`ApiResult`].

mod error;
pub mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use types::{
    AdminSignup, AdminUserRecord, AuditLogRecord, FieldRemoval, FieldUpdate, LoginRequest,
    Permissions, PreferenceField, UserProfile, UserSignup,
};

use crate::config::{Config, UrlKey};
use crate::credentials::Role;
use crate::session::Session;

/// Standard User-Agent header for prefshare requests.
pub const USER_AGENT: &str = concat!("prefshare/", env!("CARGO_PKG_VERSION"));

/// Which backend host serves an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Api,
    Profile,
}

/// How an endpoint reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessRule {
    /// Body carries `status: "success"`
    BodyStatus,
    /// HTTP 2xx
    TransportOk,
}

/// Whether an endpoint is sent with the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRule {
    Bearer,
    None,
}

/// Every backend endpoint the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    UserSignup,
    UserLogin,
    UserCheckUsername(&'a str),
    Me,
    UpdateField(PreferenceField),
    DeleteField(PreferenceField),
    AdminSignup,
    AdminLogin,
    AdminCheckUsername(&'a str),
    AdminUsers,
    AuditLogs,
    UserIps,
    UsernameById(&'a str),
}

impl Endpoint<'_> {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::UserSignup
            | Endpoint::UserLogin
            | Endpoint::UpdateField(_)
            | Endpoint::DeleteField(_)
            | Endpoint::AdminSignup
            | Endpoint::AdminLogin => Method::POST,
            Endpoint::UserCheckUsername(_)
            | Endpoint::Me
            | Endpoint::AdminCheckUsername(_)
            | Endpoint::AdminUsers
            | Endpoint::AuditLogs
            | Endpoint::UserIps
            | Endpoint::UsernameById(_) => Method::GET,
        }
    }

    pub fn host(&self) -> Host {
        match self {
            Endpoint::UserSignup
            | Endpoint::UserLogin
            | Endpoint::AdminSignup
            | Endpoint::AdminLogin
            | Endpoint::AdminUsers => Host::Api,
            Endpoint::UserCheckUsername(_)
            | Endpoint::Me
            | Endpoint::UpdateField(_)
            | Endpoint::DeleteField(_)
            | Endpoint::AdminCheckUsername(_)
            | Endpoint::AuditLogs
            | Endpoint::UserIps
            | Endpoint::UsernameById(_) => Host::Profile,
        }
    }

    pub fn success_rule(&self) -> SuccessRule {
        match self {
            Endpoint::UserSignup
            | Endpoint::UserLogin
            | Endpoint::UserCheckUsername(_)
            | Endpoint::AdminSignup
            | Endpoint::AdminLogin
            | Endpoint::AdminCheckUsername(_)
            | Endpoint::AdminUsers => SuccessRule::BodyStatus,
            Endpoint::Me
            | Endpoint::UpdateField(_)
            | Endpoint::DeleteField(_)
            | Endpoint::AuditLogs
            | Endpoint::UserIps
            | Endpoint::UsernameById(_) => SuccessRule::TransportOk,
        }
    }

    pub fn auth_rule(&self) -> AuthRule {
        match self {
            Endpoint::Me
            | Endpoint::UpdateField(_)
            | Endpoint::DeleteField(_)
            | Endpoint::AdminUsers
            | Endpoint::AuditLogs
            | Endpoint::UserIps => AuthRule::Bearer,
            Endpoint::UserSignup
            | Endpoint::UserLogin
            | Endpoint::UserCheckUsername(_)
            | Endpoint::AdminSignup
            | Endpoint::AdminLogin
            | Endpoint::AdminCheckUsername(_)
            | Endpoint::UsernameById(_) => AuthRule::None,
        }
    }

    /// Path segments below the host; dynamic parts are percent-encoded on join.
    pub fn path_segments(&self) -> Vec<String> {
        let fixed = |parts: &[&str]| parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();
        match self {
            Endpoint::UserSignup => fixed(&["api", "v1", "users", "signup"]),
            Endpoint::UserLogin => fixed(&["api", "v1", "users", "login"]),
            Endpoint::UserCheckUsername(name) => {
                let mut p = fixed(&["api", "v1", "users", "check-username"]);
                p.push((*name).to_string());
                p
            }
            Endpoint::Me => fixed(&["api", "v1", "users", "me"]),
            Endpoint::UpdateField(field) => vec![format!("update-{field}")],
            Endpoint::DeleteField(field) => vec![format!("delete-{field}")],
            Endpoint::AdminSignup => fixed(&["api", "v1", "admin", "signup"]),
            Endpoint::AdminLogin => fixed(&["api", "v1", "admin", "login"]),
            Endpoint::AdminCheckUsername(name) => {
                let mut p = fixed(&["api", "v1", "admin", "check-username"]);
                p.push((*name).to_string());
                p
            }
            Endpoint::AdminUsers => fixed(&["api", "v1", "admin", "users"]),
            Endpoint::AuditLogs => fixed(&["admin", "audit-logs"]),
            Endpoint::UserIps => fixed(&["admin", "user-ips"]),
            Endpoint::UsernameById(id) => {
                let mut p = fixed(&["admin", "get-username"]);
                p.push((*id).to_string());
                p
            }
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::UserSignup => "user_signup",
            Endpoint::UserLogin => "user_login",
            Endpoint::UserCheckUsername(_) => "user_check_username",
            Endpoint::Me => "me",
            Endpoint::UpdateField(_) => "update_field",
            Endpoint::DeleteField(_) => "delete_field",
            Endpoint::AdminSignup => "admin_signup",
            Endpoint::AdminLogin => "admin_login",
            Endpoint::AdminCheckUsername(_) => "admin_check_username",
            Endpoint::AdminUsers => "admin_users",
            Endpoint::AuditLogs => "audit_logs",
            Endpoint::UserIps => "user_ips",
            Endpoint::UsernameById(_) => "username_by_id",
        }
    }
}

/// Resolved connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub api_url: String,
    pub profile_url: String,
    pub timeout: Option<Duration>,
}

impl ApiClientConfig {
    /// Resolves hosts from env, config and defaults.
    ///
    /// # Errors
    /// Returns an error if a configured URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            api_url: config.resolve_url(UrlKey::Api)?,
            profile_url: config.resolve_url(UrlKey::Profile)?,
            timeout: config.request_timeout(),
        })
    }
}

/// Username availability as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
}

/// Preference sharing backend client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    /// Creates a client from the loaded config.
    ///
    /// # Errors
    /// Returns an error if a URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ApiClientConfig::from_config(config)?)
    }

    /// Shared HTTP client, reused by the geolocation lookup.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn base_url(&self, host: Host) -> &str {
        match host {
            Host::Api => &self.config.api_url,
            Host::Profile => &self.config.profile_url,
        }
    }

    /// Full URL for an endpoint.
    ///
    /// # Errors
    /// Returns a parse error if the base URL cannot carry a path.
    pub fn url_for(&self, endpoint: &Endpoint<'_>) -> ApiResult<url::Url> {
        let base = self.base_url(endpoint.host());
        let mut url = url::Url::parse(base)
            .map_err(|e| ApiError::parse(format!("Invalid base URL {base}: {e}"), ""))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::parse(format!("Base URL cannot be a base: {base}"), ""))?;
            segments.pop_if_empty();
            segments.extend(endpoint.path_segments());
        }
        Ok(url)
    }

    /// Sends one request and applies the endpoint's success convention.
    ///
    /// Returns the parsed JSON body on success.
    async fn send<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint<'_>,
        session: Option<&Session>,
        body: Option<&B>,
        fallback: &str,
    ) -> ApiResult<Value> {
        let url = self.url_for(&endpoint)?;
        let mut request = self.http.request(endpoint.method(), url.clone());

        if endpoint.auth_rule() == AuthRule::Bearer {
            let Some(session) = session else {
                return Err(ApiError::missing_credential("session"));
            };
            request = request.header(header::AUTHORIZATION, session.bearer());
        }

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        tracing::debug!(endpoint = endpoint.name(), %url, "sending request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint = endpoint.name(), error = %e, "request failed");
            ApiError::from_reqwest(&e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::warn!(endpoint = endpoint.name(), error = %e, "failed to read body");
            ApiError::from_reqwest(&e)
        })?;

        let json: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => {
                    tracing::warn!(endpoint = endpoint.name(), error = %e, "unparseable body");
                    return Err(ApiError::parse(format!("Invalid JSON response: {e}"), &text));
                }
                // Error pages are often HTML; the status says enough.
                Err(_) => Value::Null,
            }
        };

        let ok = match endpoint.success_rule() {
            SuccessRule::BodyStatus => {
                json.get("status").and_then(Value::as_str) == Some("success")
            }
            SuccessRule::TransportOk => status.is_success(),
        };

        if ok {
            tracing::debug!(endpoint = endpoint.name(), status = status.as_u16(), "ok");
            Ok(json)
        } else {
            let err = ApiError::rejected(status.as_u16(), &json, fallback);
            tracing::warn!(
                endpoint = endpoint.name(),
                status = status.as_u16(),
                message = %err.message,
                "backend rejected request"
            );
            Err(err)
        }
    }

    /// Signs up an end user and returns their token.
    pub async fn signup_user(&self, form: &UserSignup) -> ApiResult<String> {
        let body = self
            .send(Endpoint::UserSignup, None, Some(form), "Something went wrong!")
            .await?;
        required_token(&body, &["/data/jwt", "/data/token", "/token"])
    }

    /// Logs in an end user and returns their token.
    pub async fn login_user(&self, username: &str, password: &str) -> ApiResult<String> {
        let body = self
            .send(
                Endpoint::UserLogin,
                None,
                Some(&LoginRequest { username, password }),
                "Please try again.",
            )
            .await?;
        required_token(&body, &["/data/jwt", "/data/token", "/token"])
    }

    /// Checks whether a username is free for the given role.
    pub async fn check_username(&self, role: Role, username: &str) -> ApiResult<Availability> {
        let endpoint = match role {
            Role::User => Endpoint::UserCheckUsername(username),
            Role::Admin => Endpoint::AdminCheckUsername(username),
        };
        match self
            .send::<()>(endpoint, None, None, "Username is already taken!")
            .await
        {
            Ok(body) => {
                let available = body
                    .pointer("/data/isAvailable")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(if available {
                    Availability::Available
                } else {
                    Availability::Taken
                })
            }
            // A non-success status here means "not available", not a failure.
            Err(err) if err.kind == ApiErrorKind::Rejected && !err.is_unauthorized() => {
                Ok(Availability::Taken)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetches the signed-in user's profile.
    ///
    /// The profile arrives either at `data` or nested at `data.data`.
    pub async fn fetch_me(&self, session: &Session) -> ApiResult<UserProfile> {
        let body = self
            .send::<()>(Endpoint::Me, Some(session), None, "Failed to load user data")
            .await?;
        let profile = body
            .pointer("/data/data")
            .filter(|v| v.is_object())
            .or_else(|| body.get("data").filter(|v| v.is_object()))
            .ok_or_else(|| ApiError::parse("Profile missing from response", &body.to_string()))?;
        decode(profile)
    }

    /// Sets a field's value, granting its sharing permission.
    pub async fn update_field(
        &self,
        session: &Session,
        field: PreferenceField,
        user_id: &str,
        value: &str,
    ) -> ApiResult<()> {
        self.send(
            Endpoint::UpdateField(field),
            Some(session),
            Some(&FieldUpdate { user_id, value }),
            &format!("Failed to update {field}."),
        )
        .await
        .map(|_| ())
    }

    /// Removes a field, revoking its sharing permission.
    pub async fn delete_field(
        &self,
        session: &Session,
        field: PreferenceField,
        user_id: &str,
    ) -> ApiResult<()> {
        self.send(
            Endpoint::DeleteField(field),
            Some(session),
            Some(&FieldRemoval { user_id }),
            &format!("Failed to remove {field} permission."),
        )
        .await
        .map(|_| ())
    }

    /// Signs up an admin. The backend may or may not return a token.
    pub async fn signup_admin(
        &self,
        username: &str,
        password: &str,
        password_confirm: &str,
    ) -> ApiResult<Option<String>> {
        let body = self
            .send(
                Endpoint::AdminSignup,
                None,
                Some(&AdminSignup {
                    username,
                    password,
                    password_confirm,
                }),
                "Something went wrong!",
            )
            .await?;
        Ok(find_token(&body, &["/data/token", "/token"]))
    }

    /// Logs in an admin and returns their token.
    pub async fn login_admin(&self, username: &str, password: &str) -> ApiResult<String> {
        let body = self
            .send(
                Endpoint::AdminLogin,
                None,
                Some(&LoginRequest { username, password }),
                "Invalid username or password!",
            )
            .await?;
        required_token(&body, &["/token", "/data/token"])
    }

    /// Lists all users (admin).
    pub async fn list_users(&self, session: &Session) -> ApiResult<Vec<AdminUserRecord>> {
        let body = self
            .send::<()>(Endpoint::AdminUsers, Some(session), None, "Failed to load users")
            .await?;
        let users = body
            .pointer("/data/users")
            .filter(|v| v.is_array())
            .ok_or_else(|| ApiError::parse("No users in response", &body.to_string()))?;
        decode(users)
    }

    /// Lists audit log entries (admin).
    pub async fn audit_logs(&self, session: &Session) -> ApiResult<Vec<AuditLogRecord>> {
        let body = self
            .send::<()>(Endpoint::AuditLogs, Some(session), None, "Failed to load audit logs")
            .await?;
        decode(list_payload(&body, "logs"))
    }

    /// Lists the IP addresses users connected from (admin).
    pub async fn user_ips(&self, session: &Session) -> ApiResult<Vec<String>> {
        let body = self
            .send::<()>(Endpoint::UserIps, Some(session), None, "Failed to load user IPs")
            .await?;
        decode(list_payload(&body, "ips"))
    }

    /// Resolves a user id to a display username.
    pub async fn username_by_id(&self, user_id: &str) -> ApiResult<String> {
        let body = self
            .send::<()>(
                Endpoint::UsernameById(user_id),
                None,
                None,
                "Failed to load username",
            )
            .await?;
        body.get("username")
            .or_else(|| body.pointer("/data/username"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::parse("Username missing from response", &body.to_string()))
    }
}

/// Accepts a bare array or the array wrapped under `data` / `data.<key>`.
fn list_payload<'a>(body: &'a Value, key: &str) -> &'a Value {
    if body.is_array() {
        return body;
    }
    body.get("data")
        .and_then(|data| {
            if data.is_array() {
                Some(data)
            } else {
                data.get(key).filter(|v| v.is_array())
            }
        })
        .unwrap_or(body)
}

fn decode<T: DeserializeOwned>(value: &Value) -> ApiResult<T> {
    T::deserialize(value)
        .map_err(|e| ApiError::parse(format!("Unexpected response shape: {e}"), &value.to_string()))
}

fn find_token(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| body.pointer(p).and_then(Value::as_str))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn required_token(body: &Value, pointers: &[&str]) -> ApiResult<String> {
    find_token(body, pointers)
        .ok_or_else(|| ApiError::parse("Token missing from response", &body.to_string()))
}
