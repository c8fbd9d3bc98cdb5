//! Effective permission resolution.
//!
//! Pure derivation: (identity, roles, direct grants) → deduplicated set.
//! No IO, no caching, no errors. Missing or malformed inputs shrink the result
//! instead of failing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Identity, Permission, RolePermissionTable};

/// Deduplicated union of every permission code available to the identity.
///
/// Backed by an ordered set so snapshots and diagnostics are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectivePermissions {
    codes: BTreeSet<Permission>,
}

impl EffectivePermissions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.codes.contains(permission)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.codes.iter()
    }

    pub fn to_vec(&self) -> Vec<Permission> {
        self.codes.iter().cloned().collect()
    }
}

impl FromIterator<Permission> for EffectivePermissions {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self {
            codes: iter.into_iter().filter(|p| !p.is_blank()).collect(),
        }
    }
}

/// Resolve the effective permission set.
///
/// `effective = ⋃ role.permissions ∪ ⋃ table[role.code] ∪ grants`, or the empty
/// set when there is no identity or the identity is disabled.
pub fn resolve_permissions(
    identity: Option<&Identity>,
    grants: &[Permission],
    table: &RolePermissionTable,
) -> EffectivePermissions {
    let Some(identity) = identity.filter(|i| i.enabled) else {
        return EffectivePermissions::empty();
    };

    let from_roles = identity.roles.iter().flat_map(|role| {
        role.permissions
            .iter()
            .chain(table.permissions_for(&role.code))
    });

    from_roles.chain(grants).cloned().collect()
}
