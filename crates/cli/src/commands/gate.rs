//! Route gate evaluation.
//!
//! ```bash
//! rd-cli gate /dashboard
//! rd-cli gate /admin/users --role admin --role staff
//! rd-cli gate /catalog --public
//! ```

use rental_desk_core::Role;
use rental_desk_session::{GateDecision, RouteGate};

use super::{Controller, print};

/// Print what a gate decides for the current session at `path`.
pub fn evaluate(controller: &Controller, path: &str, roles: Vec<Role>, public: bool) {
    let gate = if public {
        RouteGate::public()
    } else {
        RouteGate::protected()
    };
    let gate = if roles.is_empty() {
        gate
    } else {
        gate.require_any_role(roles)
    }
    .with_policy(controller.policy());

    let decision = gate.evaluate(&controller.snapshot(), path);
    tracing::debug!(?decision, path, "Gate evaluated");

    match &decision {
        GateDecision::Loading => print("loading"),
        GateDecision::Render => print(format!("render {path}")),
        GateDecision::RedirectToLogin { .. } | GateDecision::Redirect { .. } => {
            if let Some(location) = decision.location(gate.policy()) {
                print(format!("redirect {location}"));
            }
        }
    }
}
