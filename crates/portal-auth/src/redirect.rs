//! Post-authentication routing decisions.

use crate::auth_fsm::SessionState;
use crate::identity::Identity;
use portal_config_and_utils::{Config, RouteTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path equality ignoring a trailing slash and any query or fragment.
    pub fn matches(&self, other: &Route) -> bool {
        normalize(&self.0) == normalize(&other.0)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Route::new(path)
    }
}

/// Chooses where an authenticated user belongs.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    login: Route,
    first_login_setup: Route,
    admin_dashboard: Route,
    dashboard: Route,
    admin_role_name: String,
}

impl RedirectPolicy {
    pub fn new(routes: &RouteTable, admin_role_name: impl Into<String>) -> Self {
        Self {
            login: Route::new(routes.login.as_str()),
            first_login_setup: Route::new(routes.first_login_setup.as_str()),
            admin_dashboard: Route::new(routes.admin_dashboard.as_str()),
            dashboard: Route::new(routes.dashboard.as_str()),
            admin_role_name: admin_role_name.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.routes, config.admin_role_name.as_str())
    }

    pub fn login_route(&self) -> &Route {
        &self.login
    }

    pub fn setup_route(&self) -> &Route {
        &self.first_login_setup
    }

    /// Landing page for the user's role.
    pub fn target_for(&self, user: &Identity) -> Route {
        if user.role_name() == self.admin_role_name {
            self.admin_dashboard.clone()
        } else {
            self.dashboard.clone()
        }
    }

    /// Navigation to perform from `current`, if any.
    pub fn decide(&self, user: Option<&Identity>, current: &Route) -> Option<Route> {
        let user = user?;

        if current.matches(&self.login) {
            if user.first_login {
                return Some(self.first_login_setup.clone());
            }
            return Some(self.target_for(user));
        }

        if current.matches(&self.first_login_setup) && !user.first_login {
            return Some(self.target_for(user));
        }

        None
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of checking a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session is still being restored.
    Pending,
    RedirectToLogin(Route),
    /// Authenticated, but the role does not belong here.
    RedirectTo(Route),
    Allow,
}

/// Gatekeeper for routes restricted to a set of roles.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    policy: RedirectPolicy,
}

impl RouteGuard {
    pub fn new(policy: RedirectPolicy) -> Self {
        Self { policy }
    }

    /// An empty `allowed_roles` admits every authenticated user.
    pub fn check(&self, state: &SessionState, allowed_roles: &[&str]) -> GuardDecision {
        if state.is_loading {
            return GuardDecision::Pending;
        }

        let user = match (&state.user, state.is_authenticated()) {
            (Some(user), true) => user,
            _ => return GuardDecision::RedirectToLogin(self.policy.login_route().clone()),
        };

        if allowed_roles.is_empty() || allowed_roles.contains(&user.role_name()) {
            GuardDecision::Allow
        } else {
            GuardDecision::RedirectTo(self.policy.target_for(user))
        }
    }
}

/// Host-side navigation effect.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> Route;
    fn navigate(&self, to: &Route);
}
