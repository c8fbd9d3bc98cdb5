use serde::{Deserialize, Serialize};

use storeops_core::UserId;

use crate::{Role, RoleCode};

/// The authenticated user as restored from the session.
///
/// Absent (`None` at call sites) when nobody is signed in. Role order is kept
/// as delivered; it has no bearing on evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
}

fn enabled_by_default() -> bool {
    true
}

impl Identity {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn role_codes(&self) -> impl Iterator<Item = &RoleCode> {
        self.roles.iter().map(|r| &r.code)
    }

    pub fn has_role_code(&self, code: &RoleCode) -> bool {
        self.role_codes().any(|c| c == code)
    }
}
