//! Authorization policy shared by every route gate.
//!
//! Owns the login route and the role → landing route table so gates never
//! carry their own copy.

use rental_desk_core::Role;

/// Default login route.
pub const LOGIN_PATH: &str = "/login";

/// Fallback route for roles without a dashboard.
pub const ROOT_PATH: &str = "/";

/// Query parameter carrying the originally requested location.
pub const FROM_PARAM: &str = "from";

/// Dashboard a role lands on when it is turned away from a route.
#[must_use]
pub const fn landing_path(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin/dashboard",
        Role::Staff => "/staff/dashboard",
        Role::Customer => "/customer/dashboard",
        Role::Unrecognized => ROOT_PATH,
    }
}

/// Route table used by [`RouteGate`](crate::gate::RouteGate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    login_path: String,
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_owned(),
        }
    }
}

impl AuthorizationPolicy {
    /// Policy with a custom login route.
    #[must_use]
    pub fn with_login_path(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Where `role` is sent when it may not enter a route.
    #[must_use]
    pub const fn landing_path(&self, role: Role) -> &'static str {
        landing_path(role)
    }

    /// Login location that returns to `from` after signing in.
    #[must_use]
    pub fn login_location(&self, from: &str) -> String {
        format!(
            "{}?{FROM_PARAM}={}",
            self.login_path,
            urlencoding::encode(from)
        )
    }

    /// Where to go after a successful sign-in: the saved `from` location if
    /// it is a local path, otherwise the role's dashboard.
    #[must_use]
    pub fn post_login_location(&self, role: Role, from: Option<&str>) -> String {
        match from {
            Some(path) if is_local_path(path) && path != self.login_path => path.to_owned(),
            _ => landing_path(role).to_owned(),
        }
    }
}

/// Only same-origin absolute paths are accepted as return locations.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
