//! Session resolution for protected routes.
//!
//! A `Session` is read from the credential store once per navigation and
//! passed explicitly to each flow; flows never go back to storage mid-way.

use std::fmt;

use crate::credentials::{CredentialStore, Role, mask_token};

const BEARER_PREFIX: &str = "Bearer ";

/// Client-side navigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Overview,
    Preferences,
    AdminLogin,
    AdminSignup,
    AdminDashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Overview => "/overview",
            Route::Preferences => "/preferences",
            Route::AdminLogin => "/admin/login",
            Route::AdminSignup => "/admin/signup",
            Route::AdminDashboard => "/admin/dashboard",
        }
    }

    /// Role whose token the route needs, if it is protected.
    pub fn requires(self) -> Option<Role> {
        match self {
            Route::Overview | Route::Preferences => Some(Role::User),
            Route::AdminDashboard => Some(Role::Admin),
            Route::Home
            | Route::Login
            | Route::Signup
            | Route::AdminLogin
            | Route::AdminSignup => None,
        }
    }

    /// Login route for a role.
    pub fn login_for(role: Role) -> Route {
        match role {
            Role::User => Route::Login,
            Role::Admin => Route::AdminLogin,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Authenticated context for one navigation.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    role: Role,
    token: String,
}

impl Session {
    /// Builds a session from a raw stored token.
    /// An existing `Bearer ` prefix is stripped so it is never doubled.
    pub fn new(role: Role, token: &str) -> Self {
        let trimmed = token.trim();
        let token = trimmed.strip_prefix(BEARER_PREFIX).unwrap_or(trimmed).trim();
        Self {
            role,
            token: token.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}

/// Outcome of entering a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Continue to the route; carries the session for protected routes.
    Proceed(Option<Session>),
    /// No credential for a protected route; go here instead and fetch nothing.
    Redirect(Route),
}

/// Resolves the session for a route against the credential store.
pub fn resolve(store: &CredentialStore, route: Route) -> Resolution {
    let Some(role) = route.requires() else {
        return Resolution::Proceed(None);
    };

    match store.token_for(role) {
        Some(token) => Resolution::Proceed(Some(Session::new(role, token))),
        None => {
            let target = Route::login_for(role);
            tracing::info!(route = %route, redirect = %target, "no {} token; redirecting", role.label());
            Resolution::Redirect(target)
        }
    }
}
