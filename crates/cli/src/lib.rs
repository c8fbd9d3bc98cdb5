//! Inspector for a session fixture: what would this user see?

use serde::{Deserialize, Serialize};

use storeops_auth::{
    AccessConfig, ConfigError, FilterPolicy, Identity, Permission, PermissionStore,
    RolePermissionTable, RouteNode, RouteTable, filter_routes, visible_menu,
};

/// Input document.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Falls back to `STOREOPS_*` environment configuration.
    #[serde(default)]
    pub config: Option<AccessConfig>,
    /// Falls back to the built-in table.
    #[serde(default)]
    pub table: Option<RolePermissionTable>,
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub grants: Vec<Permission>,
    #[serde(default)]
    pub routes: Vec<RouteNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub path: String,
    pub required: Vec<Permission>,
    pub allowed: bool,
    pub breadcrumbs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub authenticated: bool,
    pub super_role: bool,
    pub permissions: Vec<Permission>,
    pub navigation: Vec<RouteNode>,
    pub routes: Vec<RouteReport>,
}

pub fn inspect(fixture: Fixture, paths: &[String]) -> Result<Report, ConfigError> {
    let config = match fixture.config {
        Some(config) => config,
        None => AccessConfig::from_env()?,
    };
    let table = fixture.table.unwrap_or_else(RolePermissionTable::standard);
    let policy = FilterPolicy::from_bypass(config.bypass_navigation_filter);

    let store = PermissionStore::new(config, table);
    if let Some(identity) = fixture.identity {
        store.login(identity, fixture.grants);
    }
    let evaluator = store.evaluator();

    let navigation = visible_menu(&filter_routes(&fixture.routes, &evaluator, policy));
    let table = RouteTable::new(&fixture.routes);
    let routes = paths
        .iter()
        .map(|path| RouteReport {
            path: path.clone(),
            required: table.required_permissions(path),
            allowed: table.can_access(path, &evaluator),
            breadcrumbs: table.breadcrumbs(path),
        })
        .collect();

    tracing::info!(
        permissions = evaluator.snapshot().permissions().len(),
        checked_routes = paths.len(),
        "fixture inspected"
    );

    Ok(Report {
        authenticated: evaluator.is_authenticated(),
        super_role: evaluator.is_super(),
        permissions: evaluator.snapshot().permissions().to_vec(),
        navigation,
        routes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "config": { "login_path": "/login" },
        "identity": {
            "id": "0190b6c1-0000-7000-8000-000000000001",
            "name": "Quinn",
            "roles": [{ "code": "USER", "name": "User", "permissions": ["store:create"] }]
        },
        "grants": ["report:export"],
        "routes": [
            { "path": "/stores", "title": "Stores", "permissions": ["store:read"],
              "children": [{ "path": "create", "title": "New", "permissions": ["store:create"] }] },
            { "path": "/system", "title": "System", "permissions": ["system:user:manage"] }
        ]
    }"#;

    #[test]
    fn reports_permissions_navigation_and_routes() {
        let fixture: Fixture = serde_json::from_str(FIXTURE).unwrap();
        let report = inspect(fixture, &["/stores/create".to_string(), "/system".to_string()]).unwrap();

        assert!(report.authenticated);
        assert!(!report.super_role);
        let codes: Vec<&str> = report.permissions.iter().map(Permission::as_str).collect();
        assert_eq!(codes, vec!["dashboard:read", "report:export", "store:create", "store:read"]);

        assert_eq!(report.navigation.len(), 1);
        assert_eq!(report.navigation[0].children.len(), 1);

        assert!(report.routes[0].allowed);
        assert_eq!(report.routes[0].breadcrumbs, vec!["Stores", "New"]);
        assert!(!report.routes[1].allowed);
    }

    #[test]
    fn anonymous_fixture_sees_only_unrestricted_routes() {
        let fixture = Fixture {
            config: Some(AccessConfig::default()),
            table: None,
            identity: None,
            grants: Vec::new(),
            routes: vec![
                RouteNode::new("/help"),
                RouteNode::new("/stores").requires(["store:read"]),
            ],
        };
        let report = inspect(fixture, &[]).unwrap();

        assert!(!report.authenticated);
        assert!(report.permissions.is_empty());
        assert_eq!(report.navigation, vec![RouteNode::new("/help")]);
    }

    #[test]
    fn explicit_bypass_shows_everything() {
        let identity = Identity::new(storeops_core::UserId::new(), "Pat");
        let fixture = Fixture {
            config: Some(AccessConfig::default().with_bypass_navigation_filter(true)),
            table: None,
            identity: Some(identity),
            grants: Vec::new(),
            routes: vec![RouteNode::new("/system").requires(["system:user:manage"])],
        };
        let report = inspect(fixture, &[]).unwrap();
        assert_eq!(report.navigation.len(), 1);
    }
}
