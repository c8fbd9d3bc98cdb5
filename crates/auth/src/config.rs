//! Access configuration.
//!
//! Loaded from `STOREOPS_*` environment variables with dev-friendly defaults.
//! The navigation bypass is the one setting that is never read from the
//! environment: callers must opt into it explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::RoleCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false/1/0), got '{value}'")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Where unauthenticated visitors are redirected.
    pub login_path: String,
    /// Route of the standalone forbidden page.
    pub forbidden_path: String,
    /// Role code that bypasses every check.
    pub super_role: RoleCode,
    /// Render the forbidden view for unauthenticated visitors instead of redirecting.
    pub forbidden_instead_of_redirect: bool,
    /// Whether denial panels list the missing permission codes.
    pub show_missing_permissions: bool,
    /// Let the navigation filter pass every node (permission data not loaded yet).
    pub bypass_navigation_filter: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            forbidden_path: "/403".to_string(),
            super_role: RoleCode::new("SUPER_ADMIN"),
            forbidden_instead_of_redirect: false,
            show_missing_permissions: true,
            bypass_navigation_filter: false,
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = non_empty(&lookup, "STOREOPS_LOGIN_PATH")? {
            config.login_path = path;
        }
        if let Some(path) = non_empty(&lookup, "STOREOPS_FORBIDDEN_PATH")? {
            config.forbidden_path = path;
        }
        if let Some(role) = non_empty(&lookup, "STOREOPS_SUPER_ROLE")? {
            config.super_role = RoleCode::new(role);
        }
        if let Some(flag) = boolean(&lookup, "STOREOPS_FORBIDDEN_INSTEAD_OF_REDIRECT")? {
            config.forbidden_instead_of_redirect = flag;
        }
        if let Some(flag) = boolean(&lookup, "STOREOPS_SHOW_MISSING_PERMISSIONS")? {
            config.show_missing_permissions = flag;
        }

        tracing::debug!(
            login_path = %config.login_path,
            super_role = %config.super_role,
            "access config loaded"
        );
        Ok(config)
    }

    pub fn with_bypass_navigation_filter(mut self, bypass: bool) -> Self {
        self.bypass_navigation_filter = bypass;
        self
    }

    pub fn with_forbidden_instead_of_redirect(mut self, forbidden: bool) -> Self {
        self.forbidden_instead_of_redirect = forbidden;
        self
    }

    pub fn with_super_role(mut self, role: impl Into<RoleCode>) -> Self {
        self.super_role = role.into();
        self
    }
}

fn non_empty<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
        Some(v) => Ok(Some(v.trim().to_string())),
    }
}

fn boolean<F>(lookup: &F, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AccessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AccessConfig::default());
        assert_eq!(config.login_path, "/login");
        assert!(!config.bypass_navigation_filter);
    }

    #[test]
    fn reads_overrides() {
        let config = AccessConfig::from_lookup(lookup(&[
            ("STOREOPS_LOGIN_PATH", "/auth/sign-in"),
            ("STOREOPS_SUPER_ROLE", "ROOT"),
            ("STOREOPS_FORBIDDEN_INSTEAD_OF_REDIRECT", "1"),
            ("STOREOPS_SHOW_MISSING_PERMISSIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.login_path, "/auth/sign-in");
        assert_eq!(config.super_role, RoleCode::new("ROOT"));
        assert!(config.forbidden_instead_of_redirect);
        assert!(!config.show_missing_permissions);
    }

    #[test]
    fn bypass_is_never_taken_from_the_environment() {
        let config =
            AccessConfig::from_lookup(lookup(&[("STOREOPS_BYPASS_NAVIGATION_FILTER", "true")])).unwrap();
        assert!(!config.bypass_navigation_filter);
        assert!(config.with_bypass_navigation_filter(true).bypass_navigation_filter);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = AccessConfig::from_lookup(lookup(&[("STOREOPS_SHOW_MISSING_PERMISSIONS", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { var: "STOREOPS_SHOW_MISSING_PERMISSIONS", .. }));

        let err = AccessConfig::from_lookup(lookup(&[("STOREOPS_LOGIN_PATH", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty { var: "STOREOPS_LOGIN_PATH" });
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AccessConfig = serde_json::from_str(r#"{ "super_role": "OWNER" }"#).unwrap();
        assert_eq!(config.super_role, RoleCode::new("OWNER"));
        assert_eq!(config.forbidden_path, "/403");
    }
}
