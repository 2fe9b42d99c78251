//! Route authorization gate.
//!
//! A [`RouteGate`] describes what a protected view requires. Evaluating it
//! against an [`AuthState`] snapshot yields a [`GateDecision`]; the gate
//! itself holds no session state.

use rental_desk_core::Role;
use tokio::sync::watch;

use crate::machine::{AuthState, AuthStatus};
use crate::policy::AuthorizationPolicy;

/// Outcome of evaluating a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// A call is in flight; show a placeholder and decide later.
    Loading,
    /// Not signed in; go to the login route and come back to `from`.
    RedirectToLogin { login_path: String, from: String },
    /// Signed in with the wrong role; go to the role's landing route.
    Redirect { to: &'static str },
    /// Show the protected content.
    Render,
}

impl GateDecision {
    /// Location to navigate to, if the decision is a redirect.
    #[must_use]
    pub fn location(&self, policy: &AuthorizationPolicy) -> Option<String> {
        match self {
            Self::RedirectToLogin { from, .. } => Some(policy.login_location(from)),
            Self::Redirect { to } => Some((*to).to_owned()),
            Self::Loading | Self::Render => None,
        }
    }

    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::RedirectToLogin { .. } | Self::Redirect { .. })
    }
}

/// Requirements for entering a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGate {
    require_auth: bool,
    allowed_roles: Option<Vec<Role>>,
    policy: AuthorizationPolicy,
}

impl Default for RouteGate {
    fn default() -> Self {
        Self::protected()
    }
}

impl RouteGate {
    /// Gate that requires a signed-in user of any role.
    #[must_use]
    pub fn protected() -> Self {
        Self {
            require_auth: true,
            allowed_roles: None,
            policy: AuthorizationPolicy::default(),
        }
    }

    /// Gate that lets anyone through unless a role is required.
    #[must_use]
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::protected()
        }
    }

    /// Restrict the gate to a single role.
    #[must_use]
    pub fn require_role(self, role: Role) -> Self {
        self.require_any_role([role])
    }

    /// Restrict the gate to any of `roles`.
    #[must_use]
    pub fn require_any_role(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.allowed_roles = Some(roles.into_iter().collect());
        self
    }

    /// Use a non-default route table.
    #[must_use]
    pub fn with_policy(mut self, policy: AuthorizationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    /// Decide whether `state` may enter `target`.
    ///
    /// Checks run in order: in-flight call, authentication, role. The role
    /// check only applies to a signed-in user, so a public gate with a role
    /// requirement still renders for visitors.
    #[must_use]
    pub fn evaluate(&self, state: &AuthState, target: &str) -> GateDecision {
        if state.status() == AuthStatus::Authenticating {
            return GateDecision::Loading;
        }

        let user = state.user().filter(|_| state.is_authenticated());

        if self.require_auth && user.is_none() {
            return self.login_redirect(target);
        }

        if let (Some(allowed), Some(user)) = (&self.allowed_roles, user)
            && !allowed.contains(&user.role)
        {
            return GateDecision::Redirect {
                to: self.policy.landing_path(user.role),
            };
        }

        GateDecision::Render
    }

    /// Wait for the next state change on `states` and evaluate it.
    ///
    /// Returns `None` once the controller has shut down.
    pub async fn next_decision(
        &self,
        states: &mut watch::Receiver<AuthState>,
        target: &str,
    ) -> Option<GateDecision> {
        states.changed().await.ok()?;
        let state = states.borrow_and_update();
        Some(self.evaluate(&state, target))
    }

    fn login_redirect(&self, target: &str) -> GateDecision {
        GateDecision::RedirectToLogin {
            login_path: self.policy.login_path().to_owned(),
            from: target.to_owned(),
        }
    }
}
