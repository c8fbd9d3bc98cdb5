//! Route access guard.
//!
//! ```text
//! Init → Loading → Unauthenticated
//!                → AuthenticatedUnauthorized
//!                → AuthenticatedAuthorized
//! ```
//!
//! Unlike the generic evaluator, the guard denies unauthenticated visitors even
//! when the route has no permission requirement.

use serde::Serialize;

use crate::{
    AccessConfig, AuthError, AuthSession, CheckMode, Permission, PermissionStore, Requirement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Init,
    Loading,
    Unauthenticated,
    AuthenticatedUnauthorized,
    AuthenticatedAuthorized,
}

/// What the caller should render for the guarded route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Render {
    Loading,
    Content,
    /// Navigate to `to`; `from` is the location to return to after login.
    Redirect { to: String, from: String },
    /// Show the forbidden view; `path` is the configured forbidden route.
    Forbidden { path: String, missing: Vec<Permission> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub state: GuardState,
    pub render: Render,
    /// Rejection from the refresh attempt, passed through as-is.
    pub refresh_error: Option<AuthError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observed {
    revision: u64,
    authenticated: bool,
    expired: bool,
    loading: bool,
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    config: AccessConfig,
    requirement: Requirement,
    mode: CheckMode,
    state: GuardState,
    observed: Option<Observed>,
}

impl RouteGuard {
    pub fn new(config: AccessConfig, requirement: impl Into<Requirement>) -> Self {
        Self {
            config,
            requirement: requirement.into(),
            mode: CheckMode::Any,
            state: GuardState::Init,
            observed: None,
        }
    }

    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// True when the authentication flag, credential expiry, loading flag or
    /// effective set changed since the last evaluation.
    pub fn needs_reevaluation<S>(&self, session: &S, store: &PermissionStore) -> bool
    where
        S: AuthSession + ?Sized,
    {
        self.observed != Some(observe(session, store))
    }

    /// Run the state machine once for `location`.
    ///
    /// An expired credential gets exactly one refresh attempt. The store is
    /// re-read after it settles, so a logout that lands mid-refresh wins.
    pub async fn evaluate<S>(
        &mut self,
        session: &S,
        store: &PermissionStore,
        location: &str,
    ) -> GuardOutcome
    where
        S: AuthSession + ?Sized,
    {
        let snapshot = store.snapshot();
        if session.is_loading() || snapshot.loading() {
            return self.settle(session, store, GuardState::Loading, Render::Loading, None);
        }
        if !session.is_authenticated() || !snapshot.is_authenticated() {
            return self.unauthenticated(session, store, location, None);
        }

        if session.is_expired() {
            tracing::debug!(location, "credential expired; attempting refresh");
            if let Err(err) = session.refresh().await {
                tracing::warn!(location, error = %err, "credential refresh failed");
                return self.unauthenticated(session, store, location, Some(err));
            }
        }

        let evaluator = store.evaluator();
        if !session.is_authenticated() || !evaluator.is_authenticated() {
            return self.unauthenticated(session, store, location, None);
        }

        if evaluator.has_permission(&self.requirement, self.mode) {
            return self.settle(
                session,
                store,
                GuardState::AuthenticatedAuthorized,
                Render::Content,
                None,
            );
        }

        let missing = if self.config.show_missing_permissions {
            evaluator
                .check_permission(&self.requirement, self.mode)
                .missing_permissions
        } else {
            Vec::new()
        };
        self.settle(
            session,
            store,
            GuardState::AuthenticatedUnauthorized,
            Render::Forbidden {
                path: self.config.forbidden_path.clone(),
                missing,
            },
            None,
        )
    }

    fn unauthenticated<S>(
        &mut self,
        session: &S,
        store: &PermissionStore,
        location: &str,
        refresh_error: Option<AuthError>,
    ) -> GuardOutcome
    where
        S: AuthSession + ?Sized,
    {
        let render = if self.config.forbidden_instead_of_redirect {
            Render::Forbidden {
                path: self.config.forbidden_path.clone(),
                missing: Vec::new(),
            }
        } else {
            Render::Redirect {
                to: login_target(&self.config.login_path, location),
                from: location.to_string(),
            }
        };
        self.settle(session, store, GuardState::Unauthenticated, render, refresh_error)
    }

    fn settle<S>(
        &mut self,
        session: &S,
        store: &PermissionStore,
        state: GuardState,
        render: Render,
        refresh_error: Option<AuthError>,
    ) -> GuardOutcome
    where
        S: AuthSession + ?Sized,
    {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "route guard transition");
        }
        self.state = state;
        self.observed = Some(observe(session, store));
        GuardOutcome {
            state,
            render,
            refresh_error,
        }
    }
}

fn observe<S>(session: &S, store: &PermissionStore) -> Observed
where
    S: AuthSession + ?Sized,
{
    let snapshot = store.snapshot();
    Observed {
        revision: snapshot.revision(),
        authenticated: session.is_authenticated(),
        expired: session.is_expired(),
        loading: session.is_loading() || snapshot.loading(),
    }
}

/// Login URL carrying the origin so the caller can return after login.
fn login_target(login_path: &str, location: &str) -> String {
    if location.is_empty() || path_part(location) == path_part(login_path) {
        return login_path.to_string();
    }
    let separator = if login_path.contains('?') { '&' } else { '?' };
    format!("{login_path}{separator}redirect={}", urlencoding::encode(location))
}

/// Path component without query, fragment or trailing slash.
fn path_part(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
