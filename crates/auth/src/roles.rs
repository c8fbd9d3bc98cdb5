use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role code (e.g. `"STORE_MANAGER"`).
///
/// Codes are compared verbatim; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleCode {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RoleCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A role as delivered by the authentication layer.
///
/// `permissions` are the codes the role object itself carries. The static
/// [`RolePermissionTable`] is a second, independent source keyed by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub code: RoleCode,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(code: impl Into<RoleCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

/// Fixed role-code → permission mapping, independent of the role objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePermissionTable {
    entries: HashMap<RoleCode, Vec<Permission>>,
}

impl RolePermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the permission list for `code`.
    pub fn with_role<I, P>(mut self, code: impl Into<RoleCode>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.entries
            .insert(code.into(), permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Permissions the table grants to `code`; empty for unknown codes.
    pub fn permissions_for(&self, code: &RoleCode) -> &[Permission] {
        self.entries.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in table for the store-lifecycle back office.
    ///
    /// `SUPER_ADMIN` has no entry: it bypasses evaluation altogether.
    pub fn standard() -> Self {
        const READ_ALL: [&str; 6] = [
            "dashboard:read",
            "plan:read",
            "expansion:read",
            "construction:read",
            "store:read",
            "approval:read",
        ];

        Self::new()
            .with_role(
                "ADMIN",
                READ_ALL.into_iter().chain([
                    "plan:write",
                    "expansion:write",
                    "construction:write",
                    "store:create",
                    "store:update",
                    "store:delete",
                    "approval:approve",
                    "system:user:manage",
                    "system:role:manage",
                ]),
            )
            .with_role(
                "STORE_MANAGER",
                ["dashboard:read", "store:read", "store:update", "operation:read", "operation:write"],
            )
            .with_role(
                "EXPANSION_MANAGER",
                ["dashboard:read", "plan:read", "plan:write", "expansion:read", "expansion:write"],
            )
            .with_role(
                "CONSTRUCTION_MANAGER",
                ["dashboard:read", "construction:read", "construction:write", "store:read"],
            )
            .with_role("APPROVER", ["dashboard:read", "approval:read", "approval:approve"])
            .with_role("USER", ["dashboard:read", "store:read"])
    }
}
