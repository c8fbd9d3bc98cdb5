//! Permission evaluation against a published [`AccessSnapshot`].
//!
//! The evaluator is a read-only view: it never mutates the snapshot and never
//! fails. Repeated identical checks against the same snapshot revision are
//! answered from [`CheckCache`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccessSnapshot, Permission, RoleCode};

/// How multiple required permissions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// At least one required code is held.
    #[default]
    Any,
    /// Every required code is held.
    All,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeParseError {
    #[error("unsupported check mode '{0}' (expected 'any' or 'all')")]
    Unsupported(String),
}

impl FromStr for CheckMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(ModeParseError::Unsupported(other.to_string())),
        }
    }
}

/// Normalized list of required permission codes.
///
/// Absent, empty and blank inputs all normalize to "no requirement".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Requirement(Vec<Permission>);

impl Requirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Permission> {
        self.0
    }
}

impl FromIterator<Permission> for Requirement {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().filter(|p| !p.is_blank()).collect())
    }
}

impl From<&str> for Requirement {
    fn from(value: &str) -> Self {
        std::iter::once(Permission::new(value.to_owned())).collect()
    }
}

impl From<Option<&str>> for Requirement {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<&[&str]> for Requirement {
    fn from(value: &[&str]) -> Self {
        value.iter().map(|c| Permission::new((*c).to_owned())).collect()
    }
}

impl<const N: usize> From<[&str; N]> for Requirement {
    fn from(value: [&str; N]) -> Self {
        Self::from(&value[..])
    }
}

impl From<Vec<&str>> for Requirement {
    fn from(value: Vec<&str>) -> Self {
        Self::from(value.as_slice())
    }
}

impl From<Vec<Permission>> for Requirement {
    fn from(value: Vec<Permission>) -> Self {
        value.into_iter().collect()
    }
}

impl From<&[Permission]> for Requirement {
    fn from(value: &[Permission]) -> Self {
        value.iter().cloned().collect()
    }
}

impl From<&Vec<Permission>> for Requirement {
    fn from(value: &Vec<Permission>) -> Self {
        Self::from(value.as_slice())
    }
}

impl From<&Requirement> for Requirement {
    fn from(value: &Requirement) -> Self {
        value.clone()
    }
}

/// Normalized list of required role codes (any-of semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRequirement(Vec<RoleCode>);

impl RoleRequirement {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[RoleCode] {
        &self.0
    }
}

impl FromIterator<RoleCode> for RoleRequirement {
    fn from_iter<T: IntoIterator<Item = RoleCode>>(iter: T) -> Self {
        Self(iter.into_iter().filter(|r| !r.as_str().trim().is_empty()).collect())
    }
}

impl From<&str> for RoleRequirement {
    fn from(value: &str) -> Self {
        std::iter::once(RoleCode::new(value.to_owned())).collect()
    }
}

impl From<&[&str]> for RoleRequirement {
    fn from(value: &[&str]) -> Self {
        value.iter().map(|c| RoleCode::new((*c).to_owned())).collect()
    }
}

impl<const N: usize> From<[&str; N]> for RoleRequirement {
    fn from(value: [&str; N]) -> Self {
        Self::from(&value[..])
    }
}

impl From<Vec<RoleCode>> for RoleRequirement {
    fn from(value: Vec<RoleCode>) -> Self {
        value.into_iter().collect()
    }
}

impl From<&RoleRequirement> for RoleRequirement {
    fn from(value: &RoleRequirement) -> Self {
        value.clone()
    }
}

/// Full diagnostic for a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResult {
    pub required_permissions: Vec<Permission>,
    pub user_permissions: Vec<Permission>,
    /// `required - effective`, in the order the requirement listed them.
    pub missing_permissions: Vec<Permission>,
    pub has_permission: bool,
    pub reason: String,
}

#[derive(Debug, Default)]
struct CacheState {
    revision: u64,
    entries: HashMap<(Requirement, CheckMode), bool>,
}

/// Memo of check outcomes keyed by (snapshot revision, requirement, mode).
///
/// Observing a newer revision drops every entry, so a recomputed effective
/// set never answers from stale results. Checks from an older revision are
/// computed but not memoized.
#[derive(Debug, Default)]
pub struct CheckCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CheckCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of memoized outcomes for the current revision.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and adopt `revision`.
    pub fn invalidate(&self, revision: u64) {
        let mut state = self.lock();
        state.revision = revision;
        state.entries.clear();
    }

    fn get_or_compute(
        &self,
        revision: u64,
        key: (Requirement, CheckMode),
        compute: impl FnOnce(&Requirement, CheckMode) -> bool,
    ) -> bool {
        let mut state = self.lock();
        if revision < state.revision {
            // Older snapshot: answer without disturbing the current entries.
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute(&key.0, key.1);
        }
        if revision > state.revision {
            state.revision = revision;
            state.entries.clear();
        }

        if let Some(hit) = state.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return *hit;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = compute(&key.0, key.1);
        state.entries.insert(key, outcome);
        outcome
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stateless checks over one immutable snapshot.
///
/// Cheap to clone; obtain a fresh one from the store after every update.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    snapshot: Arc<AccessSnapshot>,
    cache: Arc<CheckCache>,
}

impl PermissionEvaluator {
    pub fn new(snapshot: Arc<AccessSnapshot>, cache: Arc<CheckCache>) -> Self {
        Self { snapshot, cache }
    }

    /// Evaluator with a private cache (tests, one-off checks).
    pub fn detached(snapshot: AccessSnapshot) -> Self {
        Self::new(Arc::new(snapshot), Arc::new(CheckCache::new()))
    }

    pub fn snapshot(&self) -> &AccessSnapshot {
        &self.snapshot
    }

    pub fn cache(&self) -> &CheckCache {
        &self.cache
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.is_authenticated()
    }

    pub fn is_super(&self) -> bool {
        self.snapshot.is_super()
    }

    pub fn current_roles(&self) -> Vec<RoleCode> {
        self.snapshot
            .identity()
            .map(|i| i.role_codes().cloned().collect())
            .unwrap_or_default()
    }

    /// `any`: required ∩ effective ≠ ∅. `all`: required ⊆ effective.
    ///
    /// An empty requirement passes unconditionally, even without a session.
    pub fn has_permission(&self, required: impl Into<Requirement>, mode: CheckMode) -> bool {
        let required = required.into();
        if required.is_empty() {
            return true;
        }
        if self.snapshot.is_super() {
            return true;
        }

        let permissions = self.snapshot.permissions();
        self.cache
            .get_or_compute(self.snapshot.revision(), (required, mode), |required, mode| {
                let mut held = required.as_slice().iter().map(|p| permissions.contains(p));
                match mode {
                    CheckMode::Any => held.any(|h| h),
                    CheckMode::All => held.all(|h| h),
                }
            })
    }

    pub fn has_any_permission(&self, required: impl Into<Requirement>) -> bool {
        self.has_permission(required, CheckMode::Any)
    }

    pub fn has_all_permissions(&self, required: impl Into<Requirement>) -> bool {
        self.has_permission(required, CheckMode::All)
    }

    /// True iff the identity holds at least one of the role codes.
    ///
    /// Without an authenticated identity this is always false. An empty role
    /// requirement passes for any authenticated identity.
    pub fn has_role(&self, required: impl Into<RoleRequirement>) -> bool {
        let required = required.into();
        let Some(identity) = self.snapshot.identity().filter(|_| self.is_authenticated()) else {
            return false;
        };
        if self.snapshot.is_super() || required.is_empty() {
            return true;
        }
        required.as_slice().iter().any(|code| identity.has_role_code(code))
    }

    pub fn check_permission(
        &self,
        required: impl Into<Requirement>,
        mode: CheckMode,
    ) -> PermissionCheckResult {
        let required = required.into();
        let permissions = self.snapshot.permissions();

        let missing: Vec<Permission> = if self.snapshot.is_super() {
            Vec::new()
        } else {
            required
                .as_slice()
                .iter()
                .filter(|p| !permissions.contains(p))
                .cloned()
                .collect()
        };

        let has_permission = self.has_permission(&required, mode);
        let reason = if has_permission {
            "Permission granted".to_string()
        } else {
            let joined: Vec<&str> = missing.iter().map(Permission::as_str).collect();
            format!("Missing permissions: {}", joined.join(", "))
        };

        PermissionCheckResult {
            required_permissions: required.into_vec(),
            user_permissions: permissions.to_vec(),
            missing_permissions: missing,
            has_permission,
            reason,
        }
    }
}
