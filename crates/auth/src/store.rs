//! Injectable permission state container.
//!
//! The store owns the latest authentication inputs and publishes an immutable
//! [`AccessSnapshot`] through a `watch` channel. A snapshot is fully computed
//! before it is published, so subscribers never see a half-updated role list.
//!
//! Restoration is last-write-wins: every login, logout or new restoration
//! bumps an epoch, and results that arrive for an older epoch are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::{
    AccessConfig, AuthError, AuthSession, CheckCache, EffectivePermissions, Identity, Permission,
    PermissionEvaluator, RolePermissionTable, resolve_permissions,
};

/// Immutable view of the permission state at one revision.
#[derive(Debug, Clone, Default)]
pub struct AccessSnapshot {
    revision: u64,
    authenticated: bool,
    loading: bool,
    is_super: bool,
    identity: Option<Arc<Identity>>,
    permissions: Arc<EffectivePermissions>,
}

impl AccessSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Authenticated with an identity present.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.identity.is_some()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_super(&self) -> bool {
        self.is_super
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    pub fn permissions(&self) -> &EffectivePermissions {
        &self.permissions
    }
}

/// Handle for one restoration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreTicket {
    epoch: u64,
}

#[derive(Debug, Default)]
struct Inputs {
    identity: Option<Arc<Identity>>,
    grants: Vec<Permission>,
    authenticated: bool,
    loading: bool,
    revision: u64,
    epoch: u64,
}

#[derive(Debug)]
pub struct PermissionStore {
    config: AccessConfig,
    table: RolePermissionTable,
    inputs: Mutex<Inputs>,
    tx: watch::Sender<Arc<AccessSnapshot>>,
    cache: Arc<CheckCache>,
}

impl PermissionStore {
    pub fn new(config: AccessConfig, table: RolePermissionTable) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(AccessSnapshot::default()));
        Self {
            config,
            table,
            inputs: Mutex::new(Inputs::default()),
            tx,
            cache: Arc::new(CheckCache::new()),
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn table(&self) -> &RolePermissionTable {
        &self.table
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<AccessSnapshot> {
        self.tx.borrow().clone()
    }

    /// Receive every subsequent snapshot (latest value wins).
    pub fn subscribe(&self) -> watch::Receiver<Arc<AccessSnapshot>> {
        self.tx.subscribe()
    }

    /// Evaluator bound to the latest snapshot and the shared check cache.
    pub fn evaluator(&self) -> PermissionEvaluator {
        PermissionEvaluator::new(self.snapshot(), Arc::clone(&self.cache))
    }

    pub fn login(&self, identity: Identity, grants: Vec<Permission>) {
        let mut inputs = self.lock();
        inputs.epoch += 1;
        tracing::info!(user_id = %identity.id, roles = identity.roles.len(), "session established");
        inputs.identity = Some(Arc::new(identity));
        inputs.grants = grants;
        inputs.authenticated = true;
        inputs.loading = false;
        self.publish(&mut inputs);
    }

    pub fn logout(&self) {
        let mut inputs = self.lock();
        inputs.epoch += 1;
        if let Some(identity) = &inputs.identity {
            tracing::info!(user_id = %identity.id, "session cleared");
        }
        inputs.identity = None;
        inputs.grants.clear();
        inputs.authenticated = false;
        inputs.loading = false;
        self.publish(&mut inputs);
    }

    pub fn set_grants(&self, grants: Vec<Permission>) {
        let mut inputs = self.lock();
        inputs.grants = grants;
        self.publish(&mut inputs);
    }

    pub fn set_loading(&self, loading: bool) {
        let mut inputs = self.lock();
        if inputs.loading == loading {
            return;
        }
        inputs.loading = loading;
        self.publish(&mut inputs);
    }

    /// Start a restoration; any earlier ticket becomes stale.
    pub fn begin_restore(&self) -> RestoreTicket {
        let mut inputs = self.lock();
        inputs.epoch += 1;
        inputs.loading = true;
        let ticket = RestoreTicket { epoch: inputs.epoch };
        self.publish(&mut inputs);
        ticket
    }

    /// Apply a restoration result. Returns `false` if the ticket was superseded.
    pub fn complete_restore(
        &self,
        ticket: RestoreTicket,
        identity: Option<Identity>,
        grants: Vec<Permission>,
    ) -> bool {
        let mut inputs = self.lock();
        if inputs.epoch != ticket.epoch {
            tracing::debug!(ticket = ticket.epoch, current = inputs.epoch, "discarding stale restoration");
            return false;
        }
        inputs.authenticated = identity.is_some();
        inputs.identity = identity.map(Arc::new);
        inputs.grants = grants;
        inputs.loading = false;
        self.publish(&mut inputs);
        true
    }

    /// Mark a restoration as failed. Returns `false` if the ticket was superseded.
    pub fn fail_restore(&self, ticket: RestoreTicket) -> bool {
        self.complete_restore(ticket, None, Vec::new())
    }

    /// Restore through the authentication layer and apply the outcome.
    ///
    /// Upstream rejections are returned to the caller after the store has been
    /// reset to unauthenticated. `Ok(false)` means a newer login, logout or
    /// restoration superseded this one and its result was discarded.
    pub async fn restore<S>(&self, session: &S) -> Result<bool, AuthError>
    where
        S: AuthSession + ?Sized,
    {
        let ticket = self.begin_restore();
        match session.restore().await {
            Ok(()) if session.is_authenticated() => {
                Ok(self.complete_restore(ticket, session.identity(), session.grants()))
            }
            Ok(()) => Ok(self.fail_restore(ticket)),
            Err(err) => {
                self.fail_restore(ticket);
                Err(err)
            }
        }
    }

    /// Copy the authentication layer's current state into the store.
    pub fn sync_from<S>(&self, session: &S)
    where
        S: AuthSession + ?Sized,
    {
        let authenticated = session.is_authenticated();
        let identity = session.identity().filter(|_| authenticated);

        let mut inputs = self.lock();
        inputs.epoch += 1;
        inputs.authenticated = authenticated;
        inputs.loading = session.is_loading();
        inputs.identity = identity.map(Arc::new);
        inputs.grants = session.grants();
        self.publish(&mut inputs);
    }

    fn publish(&self, inputs: &mut Inputs) {
        inputs.revision += 1;

        let identity = inputs.identity.clone();
        let authenticated = inputs.authenticated && identity.is_some();
        let permissions = if authenticated {
            resolve_permissions(identity.as_deref(), &inputs.grants, &self.table)
        } else {
            EffectivePermissions::empty()
        };
        let is_super = authenticated
            && identity
                .as_deref()
                .is_some_and(|i| i.enabled && i.has_role_code(&self.config.super_role));

        let snapshot = AccessSnapshot {
            revision: inputs.revision,
            authenticated,
            loading: inputs.loading,
            is_super,
            identity,
            permissions: Arc::new(permissions),
        };

        tracing::debug!(
            revision = snapshot.revision,
            authenticated = snapshot.authenticated,
            loading = snapshot.loading,
            permissions = snapshot.permissions.len(),
            "permission snapshot recomputed"
        );

        self.cache.invalidate(snapshot.revision);
        self.tx.send_replace(Arc::new(snapshot));
    }

    fn lock(&self) -> MutexGuard<'_, Inputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use storeops_core::UserId;

    use super::*;
    use crate::{CheckMode, Role};

    fn store() -> PermissionStore {
        PermissionStore::new(AccessConfig::default(), RolePermissionTable::standard())
    }

    fn manager() -> Identity {
        Identity::new(UserId::new(), "Morgan").with_role(Role::new("STORE_MANAGER", "Store manager"))
    }

    #[test]
    fn starts_unauthenticated_and_empty() {
        let snapshot = store().snapshot();
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.permissions().is_empty());
        assert_eq!(snapshot.revision(), 0);
    }

    #[test]
    fn login_publishes_resolved_set_and_logout_clears_it() {
        let store = store();
        store.login(manager(), vec![Permission::new("report:export")]);

        let ev = store.evaluator();
        assert!(ev.is_authenticated());
        assert!(ev.has_all_permissions(["store:update", "report:export"]));

        store.logout();
        let ev = store.evaluator();
        assert!(!ev.is_authenticated());
        assert!(ev.snapshot().permissions().is_empty());
        assert!(!ev.has_any_permission("store:read"));
    }

    #[test]
    fn every_change_bumps_the_revision() {
        let store = store();
        store.login(manager(), Vec::new());
        let first = store.snapshot().revision();
        store.set_grants(vec![Permission::new("x")]);
        assert_eq!(store.snapshot().revision(), first + 1);
    }

    #[test]
    fn set_loading_is_a_no_op_when_unchanged() {
        let store = store();
        store.set_loading(false);
        assert_eq!(store.snapshot().revision(), 0);
        store.set_loading(true);
        assert!(store.snapshot().loading());
    }

    #[test]
    fn stale_restoration_is_discarded() {
        let store = store();
        let slow = store.begin_restore();
        let fast = store.begin_restore();

        assert!(store.complete_restore(fast, Some(manager()), Vec::new()));
        let revision = store.snapshot().revision();

        assert!(!store.complete_restore(slow, None, Vec::new()));
        assert_eq!(store.snapshot().revision(), revision);
        assert!(store.snapshot().is_authenticated());
    }

    #[test]
    fn logout_supersedes_in_flight_restoration() {
        let store = store();
        let ticket = store.begin_restore();
        store.logout();

        assert!(!store.complete_restore(ticket, Some(manager()), Vec::new()));
        assert!(!store.snapshot().is_authenticated());
    }

    #[test]
    fn super_role_comes_from_config() {
        let store = PermissionStore::new(
            AccessConfig::default().with_super_role("OWNER"),
            RolePermissionTable::new(),
        );
        store.login(Identity::new(UserId::new(), "Olu").with_role(Role::new("OWNER", "Owner")), Vec::new());
        assert!(store.evaluator().has_permission("anything:at-all", CheckMode::All));
    }

    #[test]
    fn disabled_super_user_gets_nothing() {
        let store = store();
        store.login(
            Identity::new(UserId::new(), "Sam")
                .with_role(Role::new("SUPER_ADMIN", "Super"))
                .disabled(),
            Vec::new(),
        );
        let ev = store.evaluator();
        assert!(!ev.is_super());
        assert!(!ev.has_any_permission("store:read"));
    }

    #[tokio::test]
    async fn subscribers_observe_complete_snapshots() {
        let store = store();
        let mut rx = store.subscribe();

        store.login(manager(), Vec::new());
        rx.changed().await.unwrap();

        let seen = rx.borrow_and_update().clone();
        assert!(seen.is_authenticated());
        assert_eq!(seen.identity().map(|i| i.roles.len()), Some(1));
        assert!(seen.permissions().contains(&Permission::new("store:update")));
    }
}
