//! Render-gating primitives.
//!
//! Each guard turns an evaluator into a decision; the presentation layer maps
//! decisions to widgets. While the evaluator reports loading, every guard
//! answers `Loading` without evaluating anything.

use serde::Serialize;

use crate::{
    AccessConfig, CheckMode, Permission, PermissionEvaluator, Requirement, RoleCode,
    RoleRequirement,
};

/// Outcome of a content-style guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<'a, F, D> {
    Loading,
    Render,
    /// Caller-supplied fallback.
    Fallback(&'a F),
    /// Built-in denial panel.
    Denied(D),
    /// Denied and configured silent.
    Nothing,
}

impl<F, D> GuardDecision<'_, F, D> {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Built-in permission denial panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialPanel {
    pub message: String,
    /// Empty when listing is suppressed.
    pub missing: Vec<Permission>,
}

/// Built-in role denial panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDenial {
    pub message: String,
    pub required: Vec<RoleCode>,
    pub current: Vec<RoleCode>,
}

/// Wraps a block of content behind a permission requirement.
#[derive(Debug, Clone)]
pub struct ContentGuard<F = ()> {
    requirement: Requirement,
    mode: CheckMode,
    fallback: Option<F>,
    silent: bool,
    show_missing: bool,
}

impl ContentGuard<()> {
    pub fn new(requirement: impl Into<Requirement>) -> Self {
        Self {
            requirement: requirement.into(),
            mode: CheckMode::Any,
            fallback: None,
            silent: false,
            show_missing: true,
        }
    }

    /// Like [`ContentGuard::new`], listing missing codes per
    /// `show_missing_permissions`.
    pub fn from_config(requirement: impl Into<Requirement>, config: &AccessConfig) -> Self {
        Self::new(requirement).show_missing(config.show_missing_permissions)
    }
}

impl<F> ContentGuard<F> {
    pub fn mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn fallback<G>(self, fallback: G) -> ContentGuard<G> {
        ContentGuard {
            requirement: self.requirement,
            mode: self.mode,
            fallback: Some(fallback),
            silent: self.silent,
            show_missing: self.show_missing,
        }
    }

    /// Render nothing on denial (unless a fallback is set).
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn show_missing(mut self, show: bool) -> Self {
        self.show_missing = show;
        self
    }

    pub fn decide(&self, evaluator: &PermissionEvaluator) -> GuardDecision<'_, F, DenialPanel> {
        if evaluator.is_loading() {
            return GuardDecision::Loading;
        }
        if evaluator.has_permission(&self.requirement, self.mode) {
            return GuardDecision::Render;
        }
        if let Some(fallback) = &self.fallback {
            return GuardDecision::Fallback(fallback);
        }
        if self.silent {
            return GuardDecision::Nothing;
        }

        let missing = if self.show_missing {
            evaluator
                .check_permission(&self.requirement, self.mode)
                .missing_permissions
        } else {
            Vec::new()
        };
        GuardDecision::Denied(DenialPanel {
            message: "You do not have permission to view this content".to_string(),
            missing,
        })
    }
}

/// DOM-like event handed to control handlers.
pub trait ControlEvent {
    fn prevent_default(&mut self);
    fn stop_propagation(&mut self);
}

/// How a control should be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDecision {
    pub visible: bool,
    pub disabled: bool,
    /// Explanation shown on hover when denied.
    pub tip: Option<String>,
}

/// What happened when the control was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlActivation {
    Performed,
    /// The denial handler ran; default and propagation were suppressed.
    Denied,
    /// Nothing ran (loading, or denied without a denial handler).
    Ignored,
}

/// Wraps an actionable control (button, link) behind a permission requirement.
#[derive(Debug, Clone)]
pub struct ControlGuard {
    requirement: Requirement,
    mode: CheckMode,
    hide_when_denied: bool,
    tip: Option<String>,
}

impl ControlGuard {
    pub fn new(requirement: impl Into<Requirement>) -> Self {
        Self {
            requirement: requirement.into(),
            mode: CheckMode::Any,
            hide_when_denied: false,
            tip: None,
        }
    }

    pub fn mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn hide_when_denied(mut self) -> Self {
        self.hide_when_denied = true;
        self
    }

    pub fn tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }

    pub fn decide(&self, evaluator: &PermissionEvaluator) -> ControlDecision {
        if evaluator.is_loading() {
            return ControlDecision {
                visible: true,
                disabled: true,
                tip: None,
            };
        }
        if evaluator.has_permission(&self.requirement, self.mode) {
            return ControlDecision {
                visible: true,
                disabled: false,
                tip: None,
            };
        }
        ControlDecision {
            visible: !self.hide_when_denied,
            disabled: true,
            tip: self.tip.clone(),
        }
    }

    /// Dispatch an activation to the action or the denial handler.
    pub fn activate<E, A, D>(
        &self,
        evaluator: &PermissionEvaluator,
        event: &mut E,
        on_action: A,
        on_denied: Option<D>,
    ) -> ControlActivation
    where
        E: ControlEvent,
        A: FnOnce(&mut E),
        D: FnOnce(&mut E),
    {
        if evaluator.is_loading() {
            return ControlActivation::Ignored;
        }
        if evaluator.has_permission(&self.requirement, self.mode) {
            on_action(event);
            return ControlActivation::Performed;
        }
        match on_denied {
            Some(handler) => {
                event.prevent_default();
                event.stop_propagation();
                handler(event);
                ControlActivation::Denied
            }
            None => ControlActivation::Ignored,
        }
    }
}

/// Wraps content behind a role requirement (any-of).
#[derive(Debug, Clone)]
pub struct RoleGuard<F = ()> {
    roles: RoleRequirement,
    fallback: Option<F>,
    silent: bool,
    show_required: bool,
}

impl RoleGuard<()> {
    pub fn new(roles: impl Into<RoleRequirement>) -> Self {
        Self {
            roles: roles.into(),
            fallback: None,
            silent: false,
            show_required: true,
        }
    }

    pub fn from_config(roles: impl Into<RoleRequirement>, config: &AccessConfig) -> Self {
        Self::new(roles).show_required(config.show_missing_permissions)
    }
}

impl<F> RoleGuard<F> {
    pub fn fallback<G>(self, fallback: G) -> RoleGuard<G> {
        RoleGuard {
            roles: self.roles,
            fallback: Some(fallback),
            silent: self.silent,
            show_required: self.show_required,
        }
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn show_required(mut self, show: bool) -> Self {
        self.show_required = show;
        self
    }

    pub fn decide(&self, evaluator: &PermissionEvaluator) -> GuardDecision<'_, F, RoleDenial> {
        if evaluator.is_loading() {
            return GuardDecision::Loading;
        }
        if evaluator.has_role(&self.roles) {
            return GuardDecision::Render;
        }
        if let Some(fallback) = &self.fallback {
            return GuardDecision::Fallback(fallback);
        }
        if self.silent {
            return GuardDecision::Nothing;
        }

        let (required, current) = if self.show_required {
            (self.roles.as_slice().to_vec(), evaluator.current_roles())
        } else {
            (Vec::new(), Vec::new())
        };
        GuardDecision::Denied(RoleDenial {
            message: "Your role does not allow access to this content".to_string(),
            required,
            current,
        })
    }
}
