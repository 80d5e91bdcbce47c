//! Request and response bodies exchanged with the backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A shareable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreferenceField {
    Email,
    Phone,
    Address,
}

impl PreferenceField {
    pub fn all() -> &'static [PreferenceField] {
        &[
            PreferenceField::Email,
            PreferenceField::Phone,
            PreferenceField::Address,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceField::Email => "email",
            PreferenceField::Phone => "phone",
            PreferenceField::Address => "address",
        }
    }
}

impl fmt::Display for PreferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "email" => Ok(PreferenceField::Email),
            "phone" => Ok(PreferenceField::Phone),
            "address" => Ok(PreferenceField::Address),
            _ => Err(format!(
                "Unknown field: {value} (expected email, phone or address)"
            )),
        }
    }
}

/// Accepts `true`, `"true"`, `1` and friends; the backend is not consistent.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean string: {other}"))),
        },
        Value::Number(n) => Ok(n.as_i64().is_some_and(|v| v != 0)),
        Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("invalid boolean: {other}"))),
    }
}

/// Signup forms send permissions as the strings `"true"` / `"false"`.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn bool_as_string<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "true" } else { "false" })
}

/// Sharing permissions for a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub email: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub phone: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub address: bool,
}

impl Permissions {
    pub fn get(&self, field: PreferenceField) -> bool {
        match field {
            PreferenceField::Email => self.email,
            PreferenceField::Phone => self.phone,
            PreferenceField::Address => self.address,
        }
    }

    pub fn set(&mut self, field: PreferenceField, value: bool) {
        match field {
            PreferenceField::Email => self.email = value,
            PreferenceField::Phone => self.phone = value,
            PreferenceField::Address => self.address = value,
        }
    }
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

/// User signup form.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSignup {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(serialize_with = "bool_as_string")]
    pub email_permission: bool,
    #[serde(serialize_with = "bool_as_string")]
    pub phone_permission: bool,
    #[serde(serialize_with = "bool_as_string")]
    pub address_permission: bool,
}

/// Username + password pair for either role.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Admin signup form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSignup<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
}

/// Body of `update-<field>`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate<'a> {
    pub user_id: &'a str,
    pub value: &'a str,
}

/// Body of `delete-<field>`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRemoval<'a> {
    pub user_id: &'a str,
}

/// A user row from the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminUserRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

/// A raw audit log entry, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRecord {
    /// Id of the user the action was taken against
    pub user: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl AuditLogRecord {
    /// Timestamp parsed as RFC 3339, when it is one.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_permissions_accept_strings_and_bools() {
        let p: Permissions =
            serde_json::from_value(json!({"email":"true","phone":false,"address":"false"}))
                .unwrap();
        assert_eq!(
            p,
            Permissions {
                email: true,
                phone: false,
                address: false
            }
        );

        let missing: Permissions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing, Permissions::default());
    }

    #[test]
    fn test_permissions_reject_garbage_string() {
        let res: Result<Permissions, _> = serde_json::from_value(json!({"email":"maybe"}));
        assert!(res.is_err());
    }

    #[test]
    fn test_signup_sends_permissions_as_strings() {
        let form = UserSignup {
            username: "ann".into(),
            email_permission: true,
            ..Default::default()
        };
        let v = serde_json::to_value(&form).unwrap();
        assert_eq!(v["emailPermission"], "true");
        assert_eq!(v["phonePermission"], "false");
        assert_eq!(v["addressPermission"], "false");
        assert!(v.get("passwordConfirm").is_some());
    }

    #[test]
    fn test_profile_maps_underscore_id() {
        let p: UserProfile = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ann",
            "permissions": {"email": true, "phone": true, "address": false}
        }))
        .unwrap();
        assert_eq!(p.id, "u1");
        assert!(p.permissions.get(PreferenceField::Phone));
        assert!(!p.permissions.get(PreferenceField::Address));
    }

    #[test]
    fn test_field_bodies_use_camel_case() {
        let v = serde_json::to_value(FieldUpdate {
            user_id: "u1",
            value: "a@b.co",
        })
        .unwrap();
        assert_eq!(v, json!({"userId":"u1","value":"a@b.co"}));
        let v = serde_json::to_value(FieldRemoval { user_id: "u1" }).unwrap();
        assert_eq!(v, json!({"userId":"u1"}));
    }

    #[test]
    fn test_audit_timestamp_parsing() {
        let rec: AuditLogRecord = serde_json::from_value(json!({
            "user": "u1",
            "action": "update",
            "field": "email",
            "timestamp": "2024-10-01T12:30:00.000Z",
            "ipAddress": "1.2.3.4"
        }))
        .unwrap();
        assert_eq!(rec.ip_address.as_deref(), Some("1.2.3.4"));
        assert!(rec.parsed_timestamp().is_some());

        let odd = AuditLogRecord {
            timestamp: Some("yesterday".into()),
            ..rec
        };
        assert!(odd.parsed_timestamp().is_none());
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!(" Email ".parse::<PreferenceField>().unwrap(), PreferenceField::Email);
        assert!("fax".parse::<PreferenceField>().is_err());
    }
}
