//! Read-only summary of the signed-in user's sharing permissions.

use std::fmt;

use crate::api::{ApiClient, PreferenceField, UserProfile};
use crate::error::FlowError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Granted,
    Denied,
}

impl From<bool> for Grant {
    fn from(value: bool) -> Self {
        if value { Grant::Granted } else { Grant::Denied }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::Granted => f.write_str("Granted"),
            Grant::Denied => f.write_str("Denied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSummary {
    pub profile: UserProfile,
    pub grants: Vec<(PreferenceField, Grant)>,
}

impl PermissionSummary {
    pub fn from_profile(profile: UserProfile) -> Self {
        let grants = PreferenceField::all()
            .iter()
            .map(|field| (*field, Grant::from(profile.permissions.get(*field))))
            .collect();
        Self { profile, grants }
    }
}

pub async fn load_overview(
    client: &ApiClient,
    session: &Session,
) -> Result<PermissionSummary, FlowError> {
    let profile = client.fetch_me(session).await?;
    Ok(PermissionSummary::from_profile(profile))
}
