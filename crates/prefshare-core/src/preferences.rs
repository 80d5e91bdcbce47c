//! Preference sync: mirror the profile's three sharing toggles and push
//! every change to the backend.
//!
//! Each toggle moves through explicit states. Turning a toggle on opens a
//! value prompt (`PendingInput`); a valid value issues one update call.
//! Turning it off issues one removal call. A failed call rolls the toggle
//! back to its last confirmed value and records the failure.

use std::sync::OnceLock;

use regex::Regex;

use crate::api::{ApiClient, PreferenceField, UserProfile};
use crate::error::FlowError;
use crate::session::Session;

fn looks_like_email(value: &str) -> bool {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"\S+@\S+\.\S+").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Checks a value typed into the prompt; returns it trimmed.
pub fn validate_value(field: PreferenceField, value: &str) -> Result<String, FlowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlowError::invalid(format!("Please enter a valid {field}.")));
    }
    if field == PreferenceField::Email && !looks_like_email(trimmed) {
        return Err(FlowError::invalid("Please enter a valid email address."));
    }
    Ok(trimmed.to_string())
}

/// State of a single sharing toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleState {
    /// Matches the backend as of the last successful call or fetch.
    Confirmed(bool),
    /// Switched on; waiting for the user to type a value.
    PendingInput,
    /// Call in flight towards `target`.
    Pending { target: bool },
    /// Last call failed; shown value rolled back to `confirmed`.
    Failed { confirmed: bool, message: String },
}

impl ToggleState {
    /// Value the switch displays.
    pub fn shown(&self) -> bool {
        match self {
            ToggleState::Confirmed(value) | ToggleState::Failed { confirmed: value, .. } => *value,
            ToggleState::PendingInput => true,
            ToggleState::Pending { target } => *target,
        }
    }
}

/// Loaded preference screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceScreen {
    pub profile: UserProfile,
    toggles: [ToggleState; 3],
}

fn slot(field: PreferenceField) -> usize {
    match field {
        PreferenceField::Email => 0,
        PreferenceField::Phone => 1,
        PreferenceField::Address => 2,
    }
}

impl PreferenceScreen {
    pub fn from_profile(profile: UserProfile) -> Self {
        let toggles = [
            PreferenceField::Email,
            PreferenceField::Phone,
            PreferenceField::Address,
        ]
        .map(|f| ToggleState::Confirmed(profile.permissions.get(f)));
        Self { profile, toggles }
    }

    pub fn toggle(&self, field: PreferenceField) -> &ToggleState {
        &self.toggles[slot(field)]
    }

    pub fn toggles(&self) -> impl Iterator<Item = (PreferenceField, &ToggleState)> {
        PreferenceField::all()
            .iter()
            .map(|f| (*f, &self.toggles[slot(*f)]))
    }

    fn set(&mut self, field: PreferenceField, state: ToggleState) {
        self.toggles[slot(field)] = state;
    }

    fn confirm(&mut self, field: PreferenceField, on: bool, value: Option<String>) {
        self.profile.permissions.set(field, on);
        match field {
            PreferenceField::Email => self.profile.email = value,
            PreferenceField::Phone => self.profile.phone = value,
            PreferenceField::Address => self.profile.address = value,
        }
        self.set(field, ToggleState::Confirmed(on));
    }
}

/// Screen lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Loading,
    Loaded(PreferenceScreen),
    Error(String),
}

/// Drives the preference screen for one session.
pub struct PreferenceSync<'a> {
    client: &'a ApiClient,
    session: Session,
    state: SyncState,
}

impl<'a> PreferenceSync<'a> {
    pub fn new(client: &'a ApiClient, session: Session) -> Self {
        Self {
            client,
            session,
            state: SyncState::Loading,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn screen(&self) -> Option<&PreferenceScreen> {
        match &self.state {
            SyncState::Loaded(screen) => Some(screen),
            SyncState::Loading | SyncState::Error(_) => None,
        }
    }

    fn screen_mut(&mut self) -> Result<&mut PreferenceScreen, FlowError> {
        match &mut self.state {
            SyncState::Loaded(screen) => Ok(screen),
            SyncState::Loading => Err(FlowError::invalid("Preferences are still loading.")),
            SyncState::Error(message) => Err(FlowError::invalid(message.clone())),
        }
    }

    /// Fetches the profile and mirrors its permissions.
    pub async fn load(&mut self) -> &SyncState {
        self.state = SyncState::Loading;
        self.state = match self.client.fetch_me(&self.session).await {
            Ok(profile) => SyncState::Loaded(PreferenceScreen::from_profile(profile)),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load preferences");
                SyncState::Error(err.message)
            }
        };
        &self.state
    }

    /// Off -> PendingInput: the caller should now prompt for a value.
    pub fn begin_enable(&mut self, field: PreferenceField) -> Result<(), FlowError> {
        let screen = self.screen_mut()?;
        match screen.toggle(field) {
            ToggleState::Confirmed(false) | ToggleState::Failed { confirmed: false, .. } => {
                screen.set(field, ToggleState::PendingInput);
                Ok(())
            }
            ToggleState::PendingInput => Ok(()),
            ToggleState::Pending { .. } => Err(FlowError::invalid(format!(
                "An update for {field} is already in progress."
            ))),
            ToggleState::Confirmed(true) | ToggleState::Failed { confirmed: true, .. } => Err(
                FlowError::invalid(format!("{field} is already shared.")),
            ),
        }
    }

    /// PendingInput -> Off without contacting the backend.
    pub fn cancel(&mut self, field: PreferenceField) {
        if let Ok(screen) = self.screen_mut()
            && *screen.toggle(field) == ToggleState::PendingInput
        {
            screen.set(field, ToggleState::Confirmed(false));
        }
    }

    /// Submits the prompt value. Invalid input keeps the prompt open and
    /// sends nothing; a valid value issues exactly one update call.
    pub async fn submit_value(
        &mut self,
        field: PreferenceField,
        value: &str,
    ) -> Result<(), FlowError> {
        let screen = self.screen_mut()?;
        if *screen.toggle(field) != ToggleState::PendingInput {
            return Err(FlowError::invalid(format!(
                "No value prompt is open for {field}."
            )));
        }
        let value = validate_value(field, value)?;
        let user_id = screen.profile.id.clone();
        screen.set(field, ToggleState::Pending { target: true });

        let result = self
            .client
            .update_field(&self.session, field, &user_id, &value)
            .await;

        let screen = self.screen_mut()?;
        match result {
            Ok(()) => {
                tracing::info!(%field, "permission granted");
                screen.confirm(field, true, Some(value));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%field, error = %err, "update failed; rolling back");
                screen.set(
                    field,
                    ToggleState::Failed {
                        confirmed: false,
                        message: err.message.clone(),
                    },
                );
                Err(err.into())
            }
        }
    }

    /// On -> Off: issues exactly one removal call, no prompt.
    pub async fn disable(&mut self, field: PreferenceField) -> Result<(), FlowError> {
        let screen = self.screen_mut()?;
        match screen.toggle(field) {
            ToggleState::Confirmed(true) | ToggleState::Failed { confirmed: true, .. } => {}
            ToggleState::PendingInput => {
                screen.set(field, ToggleState::Confirmed(false));
                return Ok(());
            }
            ToggleState::Pending { .. } => {
                return Err(FlowError::invalid(format!(
                    "An update for {field} is already in progress."
                )));
            }
            ToggleState::Confirmed(false) | ToggleState::Failed { confirmed: false, .. } => {
                return Err(FlowError::invalid(format!("{field} is not shared.")));
            }
        }
        let user_id = screen.profile.id.clone();
        screen.set(field, ToggleState::Pending { target: false });

        let result = self
            .client
            .delete_field(&self.session, field, &user_id)
            .await;

        let screen = self.screen_mut()?;
        match result {
            Ok(()) => {
                tracing::info!(%field, "permission removed");
                screen.confirm(field, false, None);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%field, error = %err, "removal failed; rolling back");
                screen.set(
                    field,
                    ToggleState::Failed {
                        confirmed: true,
                        message: err.message.clone(),
                    },
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiClientConfig;
    use crate::credentials::Role;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiClientConfig {
            api_url: server.uri(),
            profile_url: server.uri(),
            timeout: None,
        })
        .unwrap()
    }

    async fn mount_me(server: &MockServer, email: bool, phone: bool, address: bool) {
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"data": {
                    "_id": "u1",
                    "permissions": {"email": email, "phone": phone, "address": address}
                }}
            })))
            .mount(server)
            .await;
    }

    async fn loaded<'a>(client: &'a ApiClient) -> PreferenceSync<'a> {
        let mut sync = PreferenceSync::new(client, Session::new(Role::User, "tok"));
        sync.load().await;
        assert!(sync.screen().is_some(), "expected loaded state");
        sync
    }

    #[test]
    fn test_validate_value() {
        assert_eq!(
            validate_value(PreferenceField::Email, " user@example.com ").unwrap(),
            "user@example.com"
        );
        assert_eq!(
            validate_value(PreferenceField::Email, "not-an-email")
                .unwrap_err()
                .to_string(),
            "Please enter a valid email address."
        );
        assert_eq!(
            validate_value(PreferenceField::Phone, "   ")
                .unwrap_err()
                .to_string(),
            "Please enter a valid phone."
        );
        assert!(validate_value(PreferenceField::Address, "1 Main St").is_ok());
    }

    #[tokio::test]
    async fn test_load_mirrors_permissions() {
        let server = MockServer::start().await;
        mount_me(&server, true, false, true).await;
        let client = client_for(&server);
        let sync = loaded(&client).await;

        let screen = sync.screen().unwrap();
        assert_eq!(*screen.toggle(PreferenceField::Email), ToggleState::Confirmed(true));
        assert_eq!(*screen.toggle(PreferenceField::Phone), ToggleState::Confirmed(false));
        assert!(screen.toggle(PreferenceField::Address).shown());
    }

    #[tokio::test]
    async fn test_load_error_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad token"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = PreferenceSync::new(&client, Session::new(Role::User, "tok"));
        assert_eq!(*sync.load().await, SyncState::Error("bad token".into()));
        assert!(sync.begin_enable(PreferenceField::Email).is_err());
    }

    #[tokio::test]
    async fn test_enable_with_valid_value_issues_one_update() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, false).await;
        Mock::given(method("POST"))
            .and(path("/update-email"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"userId": "u1", "value": "user@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = loaded(&client).await;
        sync.begin_enable(PreferenceField::Email).unwrap();
        assert_eq!(
            *sync.screen().unwrap().toggle(PreferenceField::Email),
            ToggleState::PendingInput
        );

        sync.submit_value(PreferenceField::Email, "user@example.com")
            .await
            .unwrap();
        let screen = sync.screen().unwrap();
        assert_eq!(*screen.toggle(PreferenceField::Email), ToggleState::Confirmed(true));
        assert_eq!(screen.profile.email.as_deref(), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_invalid_email_issues_no_call() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, false).await;
        Mock::given(method("POST"))
            .and(path("/update-email"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = loaded(&client).await;
        sync.begin_enable(PreferenceField::Email).unwrap();
        let err = sync
            .submit_value(PreferenceField::Email, "not-an-email")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid email address.");
        assert_eq!(
            *sync.screen().unwrap().toggle(PreferenceField::Email),
            ToggleState::PendingInput
        );
    }

    #[tokio::test]
    async fn test_cancel_reverts_to_off() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, false).await;
        let client = client_for(&server);
        let mut sync = loaded(&client).await;

        sync.begin_enable(PreferenceField::Phone).unwrap();
        sync.cancel(PreferenceField::Phone);
        assert_eq!(
            *sync.screen().unwrap().toggle(PreferenceField::Phone),
            ToggleState::Confirmed(false)
        );
    }

    #[tokio::test]
    async fn test_disable_issues_one_removal_with_only_user_id() {
        let server = MockServer::start().await;
        mount_me(&server, false, true, false).await;
        Mock::given(method("POST"))
            .and(path("/delete-phone"))
            .and(body_json(json!({"userId": "u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = loaded(&client).await;
        sync.disable(PreferenceField::Phone).await.unwrap();
        assert_eq!(
            *sync.screen().unwrap().toggle(PreferenceField::Phone),
            ToggleState::Confirmed(false)
        );
    }

    #[tokio::test]
    async fn test_failed_removal_rolls_back_to_on() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, true).await;
        Mock::given(method("POST"))
            .and(path("/delete-address"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = loaded(&client).await;
        let err = sync.disable(PreferenceField::Address).await.unwrap_err();
        assert!(matches!(err, FlowError::Api(_)));

        let toggle = sync.screen().unwrap().toggle(PreferenceField::Address);
        assert!(toggle.shown());
        assert_eq!(
            *toggle,
            ToggleState::Failed {
                confirmed: true,
                message: "db down".into()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back_to_off() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, false).await;
        Mock::given(method("POST"))
            .and(path("/update-phone"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut sync = loaded(&client).await;
        sync.begin_enable(PreferenceField::Phone).unwrap();
        let err = sync
            .submit_value(PreferenceField::Phone, "555-0100")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update phone.");
        assert!(!sync.screen().unwrap().toggle(PreferenceField::Phone).shown());

        // A failed toggle can be retried.
        sync.begin_enable(PreferenceField::Phone).unwrap();
    }

    #[tokio::test]
    async fn test_disable_when_off_is_rejected_locally() {
        let server = MockServer::start().await;
        mount_me(&server, false, false, false).await;
        let client = client_for(&server);
        let mut sync = loaded(&client).await;

        assert!(sync.disable(PreferenceField::Email).await.is_err());
        // Only the profile fetch reached the server.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
