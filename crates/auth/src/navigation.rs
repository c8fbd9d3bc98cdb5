//! Navigation tree filtering and route lookup.
//!
//! Filtering is pure: the input tree is never touched and a new pruned tree is
//! returned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionEvaluator};

/// One route / menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    /// Absolute (`/stores`) or relative to the parent (`detail`).
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Any-of requirement; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteNode>,
    /// Routable, but never shown in menus.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub hidden: bool,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            permissions: Vec::new(),
            children: Vec::new(),
            hidden: false,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn requires<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn clone_shallow(&self) -> Self {
        Self {
            path: self.path.clone(),
            title: self.title.clone(),
            permissions: self.permissions.clone(),
            children: Vec::new(),
            hidden: self.hidden,
        }
    }
}

/// Whether the filter consults the evaluator at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterPolicy {
    #[default]
    Enforce,
    /// Keep every node. Only for states where permission data is not loaded.
    PassAll,
}

impl FilterPolicy {
    pub fn from_bypass(bypass: bool) -> Self {
        if bypass { Self::PassAll } else { Self::Enforce }
    }
}

/// Keep nodes whose own requirement passes (`any` mode), children recursively.
///
/// A node without a requirement survives even when all its children are
/// pruned.
pub fn filter_routes(
    nodes: &[RouteNode],
    evaluator: &PermissionEvaluator,
    policy: FilterPolicy,
) -> Vec<RouteNode> {
    if policy == FilterPolicy::PassAll {
        return nodes.to_vec();
    }

    nodes
        .iter()
        .filter(|node| evaluator.has_any_permission(&node.permissions))
        .map(|node| RouteNode {
            children: filter_routes(&node.children, evaluator, policy),
            ..node.clone_shallow()
        })
        .collect()
}

/// Drop `hidden` nodes (and their subtrees) for menu rendering.
pub fn visible_menu(nodes: &[RouteNode]) -> Vec<RouteNode> {
    nodes
        .iter()
        .filter(|node| !node.hidden)
        .map(|node| RouteNode {
            children: visible_menu(&node.children),
            ..node.clone_shallow()
        })
        .collect()
}

#[derive(Debug, Clone)]
struct RouteEntry {
    /// Requirement of every level, root first.
    levels: Vec<Vec<Permission>>,
    breadcrumbs: Vec<String>,
}

/// Full-path index over a route tree.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
}

impl RouteTable {
    pub fn new(nodes: &[RouteNode]) -> Self {
        let mut table = Self::default();
        table.index(nodes, "", &[], &[]);
        table
    }

    fn index(
        &mut self,
        nodes: &[RouteNode],
        parent: &str,
        levels: &[Vec<Permission>],
        breadcrumbs: &[String],
    ) {
        for node in nodes {
            let path = join_path(parent, &node.path);

            let mut node_levels = levels.to_vec();
            node_levels.push(node.permissions.clone());

            let mut node_crumbs = breadcrumbs.to_vec();
            node_crumbs.push(node.title.clone().unwrap_or_else(|| node.path.clone()));

            self.index(&node.children, &path, &node_levels, &node_crumbs);
            self.entries.entry(path).or_insert(RouteEntry {
                levels: node_levels,
                breadcrumbs: node_crumbs,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `path` resolves to a registered route (pattern or literal).
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Resolve a concrete location to its route entry.
    ///
    /// Literal matches win; otherwise `:param` segments match any one segment
    /// and a trailing `*` matches the rest. Among several patterns the one with
    /// static segments earliest is chosen.
    fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        let path = normalize(path);
        if let Some(entry) = self.entries.get(path) {
            return Some(entry);
        }

        let segments: Vec<&str> = split_segments(path);
        self.entries
            .iter()
            .filter_map(|(pattern, entry)| {
                match_rank(pattern, &segments).map(|rank| (rank, pattern, entry))
            })
            .max_by(|(rank_a, pattern_a, _), (rank_b, pattern_b, _)| {
                rank_a.cmp(rank_b).then_with(|| pattern_b.cmp(pattern_a))
            })
            .map(|(_, _, entry)| entry)
    }

    /// Codes required from root to `path`, ancestors first, deduplicated.
    /// Unknown paths require nothing.
    pub fn required_permissions(&self, path: &str) -> Vec<Permission> {
        let mut out: Vec<Permission> = Vec::new();
        if let Some(entry) = self.lookup(path) {
            for code in entry.levels.iter().flatten() {
                if !out.contains(code) {
                    out.push(code.clone());
                }
            }
        }
        out
    }

    /// Every level on the way to `path` must pass. Unknown paths are denied.
    pub fn can_access(&self, path: &str, evaluator: &PermissionEvaluator) -> bool {
        match self.lookup(path) {
            Some(entry) => entry
                .levels
                .iter()
                .all(|level| evaluator.has_any_permission(level)),
            None => {
                tracing::debug!(path, "access check for unregistered route");
                false
            }
        }
    }

    pub fn breadcrumbs(&self, path: &str) -> Vec<String> {
        self.lookup(path)
            .map(|e| e.breadcrumbs.clone())
            .unwrap_or_default()
    }
}

fn join_path(parent: &str, path: &str) -> String {
    if path.starts_with('/') || parent.is_empty() {
        let joined = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
        return normalize(&joined).to_string();
    }
    let joined = format!("{}/{}", parent.trim_end_matches('/'), path);
    normalize(&joined).to_string()
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Per-segment specificity (2 static, 1 param, 0 wildcard) if `pattern`
/// matches `segments`.
fn match_rank(pattern: &str, segments: &[&str]) -> Option<Vec<u8>> {
    let parts = split_segments(pattern);
    let mut rank = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        if *part == "*" {
            // A wildcard swallows at least one remaining segment.
            if i != parts.len() - 1 || segments.len() <= i {
                return None;
            }
            rank.push(0);
            return Some(rank);
        }
        let segment = segments.get(i)?;
        if part.starts_with(':') {
            rank.push(1);
        } else if part == segment {
            rank.push(2);
        } else {
            return None;
        }
    }

    (parts.len() == segments.len()).then_some(rank)
}

/// Strip query/fragment and trailing slash (root stays `/`).
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use storeops_core::UserId;

    use super::*;
    use crate::{AccessConfig, Identity, PermissionStore, Role, RolePermissionTable};

    fn evaluator(codes: &[&'static str]) -> PermissionEvaluator {
        let store = PermissionStore::new(AccessConfig::default(), RolePermissionTable::new());
        store.login(
            Identity::new(UserId::new(), "Jo")
                .with_role(Role::new("USER", "User").with_permissions(codes.iter().copied())),
            Vec::new(),
        );
        store.evaluator()
    }

    fn tree() -> Vec<RouteNode> {
        vec![
            RouteNode::new("/dashboard").titled("Dashboard"),
            RouteNode::new("/stores")
                .titled("Stores")
                .requires(["store:read"])
                .child(RouteNode::new("list").titled("All stores"))
                .child(RouteNode::new(":id").titled("Detail").hidden())
                .child(RouteNode::new("create").titled("New store").requires(["store:create"])),
            RouteNode::new("/system")
                .titled("System")
                .child(RouteNode::new("users").requires(["system:user:manage"]))
                .child(RouteNode::new("roles").requires(["system:role:manage"])),
        ]
    }

    fn paths(nodes: &[RouteNode]) -> Vec<String> {
        let mut out = Vec::new();
        for node in nodes {
            out.push(node.path.clone());
            out.extend(paths(&node.children).into_iter().map(|p| format!("{}>{}", node.path, p)));
        }
        out
    }

    #[test]
    fn prunes_by_permission_recursively() {
        let filtered = filter_routes(&tree(), &evaluator(&["store:read"]), FilterPolicy::Enforce);
        assert_eq!(
            paths(&filtered),
            vec!["/dashboard", "/stores", "/stores>list", "/stores>:id", "/system"]
        );
    }

    #[test]
    fn unrestricted_parent_survives_with_no_children() {
        let filtered = filter_routes(&tree(), &evaluator(&[]), FilterPolicy::Enforce);
        let system = filtered.iter().find(|n| n.path == "/system").unwrap();
        assert!(system.children.is_empty());
        assert!(!filtered.iter().any(|n| n.path == "/stores"));
    }

    #[test]
    fn input_tree_is_left_untouched() {
        let original = tree();
        let _ = filter_routes(&original, &evaluator(&[]), FilterPolicy::Enforce);
        assert_eq!(original, tree());
    }

    #[test]
    fn pass_all_policy_keeps_everything() {
        let filtered = filter_routes(&tree(), &evaluator(&[]), FilterPolicy::from_bypass(true));
        assert_eq!(filtered, tree());
    }

    #[test]
    fn visible_menu_drops_hidden_nodes() {
        let menu = visible_menu(&tree());
        let stores = menu.iter().find(|n| n.path == "/stores").unwrap();
        assert!(stores.children.iter().all(|c| c.path != ":id"));
    }

    #[test]
    fn route_table_joins_paths_and_accumulates_requirements() {
        let table = RouteTable::new(&tree());
        assert!(table.contains("/stores/create"));
        assert!(table.contains("/stores/:id/"));
        assert_eq!(
            table.required_permissions("/stores/create?from=menu"),
            vec![Permission::new("store:read"), Permission::new("store:create")]
        );
        assert!(table.required_permissions("/nowhere").is_empty());
        assert_eq!(table.breadcrumbs("/stores/create"), vec!["Stores", "New store"]);
    }

    #[test]
    fn concrete_locations_resolve_through_param_segments() {
        let table = RouteTable::new(&tree());

        assert!(table.contains("/stores/42"));
        assert_eq!(table.required_permissions("/stores/42"), vec![Permission::new("store:read")]);
        assert_eq!(table.breadcrumbs("/stores/42?tab=plan"), vec!["Stores", "Detail"]);

        let reader = evaluator(&["store:read"]);
        assert!(table.can_access("/stores/42", &reader));
        assert!(!table.can_access("/stores/42", &evaluator(&[])));
        assert!(!table.can_access("/stores/42/extra", &reader));
    }

    #[test]
    fn literal_routes_win_over_params() {
        let table = RouteTable::new(&tree());
        assert_eq!(
            table.required_permissions("/stores/create"),
            vec![Permission::new("store:read"), Permission::new("store:create")]
        );
        assert_eq!(table.breadcrumbs("/stores/create"), vec!["Stores", "New store"]);
    }

    #[test]
    fn wildcard_matches_remaining_segments() {
        let routes = vec![
            RouteNode::new("/reports")
                .requires(["report:read"])
                .child(RouteNode::new("*").titled("Any report"))
                .child(RouteNode::new(":kind/summary").titled("Summary")),
        ];
        let table = RouteTable::new(&routes);

        assert_eq!(table.breadcrumbs("/reports/sales/2024/q1"), vec!["/reports", "Any report"]);
        assert_eq!(table.breadcrumbs("/reports/sales/summary"), vec!["/reports", "Summary"]);
        assert_eq!(table.required_permissions("/reports/x"), vec![Permission::new("report:read")]);
        assert!(!table.contains("/reportsx"));
    }

    #[test]
    fn can_access_requires_every_level() {
        let table = RouteTable::new(&tree());

        let creator_only = evaluator(&["store:create"]);
        assert!(!table.can_access("/stores/create", &creator_only));

        let full = evaluator(&["store:read", "store:create"]);
        assert!(table.can_access("/stores/create", &full));
        assert!(table.can_access("/dashboard", &full));
        assert!(!table.can_access("/unregistered", &full));
    }

    fn arb_tree() -> impl Strategy<Value = Vec<RouteNode>> {
        let leaf = ("[a-c]", proptest::collection::vec("[a-c]:r", 0..2))
            .prop_map(|(path, codes)| RouteNode::new(path).requires(codes));
        let node = leaf.prop_recursive(3, 24, 4, |inner| {
            (
                "[a-c]",
                proptest::collection::vec("[a-c]:r", 0..2),
                proptest::collection::vec(inner, 0..4),
            )
                .prop_map(|(path, codes, children)| RouteNode {
                    children,
                    ..RouteNode::new(path).requires(codes)
                })
        });
        proptest::collection::vec(node, 0..4)
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(nodes in arb_tree(), held in proptest::collection::vec("[a-c]:r", 0..3)) {
            let store = PermissionStore::new(AccessConfig::default(), RolePermissionTable::new());
            store.login(
                Identity::new(UserId::new(), "Prop"),
                held.into_iter().map(Permission::from).collect(),
            );
            let ev = store.evaluator();

            let once = filter_routes(&nodes, &ev, FilterPolicy::Enforce);
            let twice = filter_routes(&once, &ev, FilterPolicy::Enforce);
            prop_assert_eq!(once, twice);
        }
    }
}
