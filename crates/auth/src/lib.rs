//! `storeops-auth` — client-side permission evaluation for the store-lifecycle
//! back office.
//!
//! This crate decides what a single, already-authenticated client may render.
//! It is intentionally decoupled from HTTP, token storage and widgets: the
//! authentication layer is consumed through [`AuthSession`], and every guard
//! returns a render *decision* rather than markup.

pub mod config;
pub mod evaluator;
pub mod guards;
pub mod identity;
pub mod navigation;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod route_guard;
pub mod session;
pub mod store;

pub use config::{AccessConfig, ConfigError};
pub use evaluator::{
    CheckCache, CheckMode, ModeParseError, PermissionCheckResult, PermissionEvaluator, Requirement,
    RoleRequirement,
};
pub use guards::{
    ContentGuard, ControlActivation, ControlDecision, ControlEvent, ControlGuard, DenialPanel,
    GuardDecision, RoleDenial, RoleGuard,
};
pub use identity::Identity;
pub use navigation::{FilterPolicy, RouteNode, RouteTable, filter_routes, visible_menu};
pub use permissions::Permission;
pub use resolver::{EffectivePermissions, resolve_permissions};
pub use roles::{Role, RoleCode, RolePermissionTable};
pub use route_guard::{GuardOutcome, GuardState, Render, RouteGuard};
pub use session::{AuthError, AuthSession};
pub use store::{AccessSnapshot, PermissionStore, RestoreTicket};
