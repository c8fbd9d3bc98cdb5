//! Contract consumed from the authentication layer.
//!
//! Token transport, storage and credential handling live behind this trait;
//! the permission subsystem only reads flags and awaits the async operations.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Identity, Permission};

/// Rejection raised by the authentication layer.
///
/// These are passed through untouched; the permission subsystem never retries
/// or converts them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session restoration failed: {0}")]
    Restore(String),

    #[error("credential refresh failed: {0}")]
    Refresh(String),

    #[error("logout failed: {0}")]
    Logout(String),
}

#[async_trait]
pub trait AuthSession: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// True while the session is being restored on startup.
    fn is_loading(&self) -> bool;

    /// True when the credential is past its validity window.
    fn is_expired(&self) -> bool;

    fn identity(&self) -> Option<Identity>;

    /// Permissions granted to the session outside any role.
    fn grants(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Restore the persisted session (startup).
    async fn restore(&self) -> Result<(), AuthError>;

    /// Renew an expired credential. May reject.
    async fn refresh(&self) -> Result<(), AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}
