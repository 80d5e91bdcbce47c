//! Admin dashboard aggregation.
//!
//! Three sections are loaded strictly in order: the user list, the audit log
//! and the location breakdown of connecting IPs. Each section degrades on its
//! own; lookups that fail inside a section resolve to [`UNKNOWN`]. City
//! lookups never exceed the configured concurrency.

use std::collections::BTreeMap;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};

use crate::api::{AdminUserRecord, ApiClient, AuditLogRecord};
use crate::geo::{GeoLocator, UNKNOWN};
use crate::session::Session;

/// A user row with its resolved username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub record: AdminUserRecord,
    pub username: String,
}

/// An audit log entry with the acting user's name and city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub record: AuditLogRecord,
    pub username: String,
    pub city: String,
}

/// City -> number of IPs seen there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationAggregate {
    counts: BTreeMap<String, usize>,
}

impl LocationAggregate {
    pub fn record(&mut self, city: impl Into<String>) {
        *self.counts.entry(city.into()).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn get(&self, city: &str) -> usize {
        self.counts.get(city).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(city, n)| (city.as_str(), *n))
    }

    /// Fraction of all IPs located in `city` (0.0 when empty).
    pub fn share(&self, city: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(city) as f64 / total as f64
    }
}

impl<S: Into<String>> FromIterator<S> for LocationAggregate {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut agg = Self::default();
        for city in iter {
            agg.record(city);
        }
        agg
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub users: Vec<UserRow>,
    pub audit_logs: Vec<AuditRow>,
    pub locations: LocationAggregate,
    /// One line per section that could not be loaded.
    pub warnings: Vec<String>,
}

async fn username_or_unknown(client: &ApiClient, user_id: &str) -> String {
    match client.username_by_id(user_id).await {
        Ok(name) => name,
        Err(err) => {
            tracing::debug!(user_id, error = %err, "username lookup failed");
            UNKNOWN.to_string()
        }
    }
}

async fn load_users(client: &ApiClient, session: &Session) -> Result<Vec<UserRow>, String> {
    let records = client.list_users(session).await.map_err(|e| {
        tracing::warn!(error = %e, "failed to load users");
        format!("Users unavailable: {e}")
    })?;

    let names = join_all(
        records
            .iter()
            .map(|record| username_or_unknown(client, &record.id)),
    )
    .await;

    Ok(records
        .into_iter()
        .zip(names)
        .map(|(record, username)| UserRow { record, username })
        .collect())
}

async fn load_audit_logs(
    client: &ApiClient,
    geo: &GeoLocator,
    session: &Session,
    concurrency: usize,
) -> Result<Vec<AuditRow>, String> {
    let records = client.audit_logs(session).await.map_err(|e| {
        tracing::warn!(error = %e, "failed to load audit logs");
        format!("Audit logs unavailable: {e}")
    })?;

    let rows: Vec<AuditRow> = stream::iter(records)
        .map(|record| async move {
            let (username, city) = futures_util::join!(
                username_or_unknown(client, &record.user),
                async {
                    match record.ip_address.as_deref() {
                        Some(ip) => geo.city_for_ip(ip).await,
                        None => UNKNOWN.to_string(),
                    }
                }
            );
            AuditRow {
                record,
                username,
                city,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;
    Ok(rows)
}

async fn load_locations(
    client: &ApiClient,
    geo: &GeoLocator,
    session: &Session,
    concurrency: usize,
) -> Result<LocationAggregate, String> {
    let ips = client.user_ips(session).await.map_err(|e| {
        tracing::warn!(error = %e, "failed to load user IPs");
        format!("Locations unavailable: {e}")
    })?;

    let cities: Vec<String> = stream::iter(ips)
        .map(|ip| async move { geo.city_for_ip(&ip).await })
        .buffered(concurrency.max(1))
        .collect()
        .await;
    Ok(cities.into_iter().collect())
}

/// Loads every dashboard section. Never fails; missing sections are empty
/// and explained in [`Dashboard::warnings`].
pub async fn load_dashboard(
    client: &ApiClient,
    geo: &GeoLocator,
    session: &Session,
    concurrency: usize,
) -> Dashboard {
    let users = load_users(client, session).await;
    let audit_logs = load_audit_logs(client, geo, session, concurrency).await;
    let locations = load_locations(client, geo, session, concurrency).await;

    let mut dashboard = Dashboard::default();
    match users {
        Ok(rows) => dashboard.users = rows,
        Err(w) => dashboard.warnings.push(w),
    }
    match audit_logs {
        Ok(rows) => dashboard.audit_logs = rows,
        Err(w) => dashboard.warnings.push(w),
    }
    match locations {
        Ok(agg) => dashboard.locations = agg,
        Err(w) => dashboard.warnings.push(w),
    }
    tracing::info!(
        users = dashboard.users.len(),
        audit_logs = dashboard.audit_logs.len(),
        ips = dashboard.locations.total(),
        warnings = dashboard.warnings.len(),
        "dashboard loaded"
    );
    dashboard
}
