use serde::Serialize;

use crate::models::users::Role;
use crate::services::session::Session;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "lowercase")]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

/// Espaces réservés à un rôle
const ROLE_PREFIXES: [(&str, Role); 3] = [
    ("/etudiant", Role::Student),
    ("/entreprise", Role::Company),
    ("/admin", Role::Administration),
];

const PUBLIC_ROUTES: [&str; 3] = ["/", "/login", "/register"];

pub fn role_for_path(path: &str) -> Option<Role> {
    ROLE_PREFIXES
        .iter()
        .find(|(prefix, _)| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .map(|(_, role)| *role)
}

pub fn check_route(session: Option<&Session>, allowed: Option<&[Role]>) -> RouteDecision {
    let Some(session) = session else {
        return RouteDecision::Redirect(LOGIN_ROUTE);
    };

    match allowed {
        Some(roles) if !roles.contains(&session.role()) => RouteDecision::Redirect(HOME_ROUTE),
        _ => RouteDecision::Allow,
    }
}

/// Décision pour une URL du client
pub fn check_path(session: Option<&Session>, path: &str) -> RouteDecision {
    if PUBLIC_ROUTES.contains(&path) {
        return RouteDecision::Allow;
    }

    match role_for_path(path) {
        Some(role) => check_route(session, Some(&[role])),
        None => check_route(session, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::tests::{admin_demo, student_demo};

    #[test]
    fn test_unauthenticated_is_sent_to_login() {
        assert_eq!(
            check_path(None, "/etudiant/candidatures"),
            RouteDecision::Redirect("/login")
        );
        assert_eq!(check_path(None, "/profil"), RouteDecision::Redirect("/login"));
    }

    #[test]
    fn test_wrong_role_is_sent_home() {
        let student = student_demo();
        assert_eq!(
            check_path(Some(&student), "/admin/conventions"),
            RouteDecision::Redirect("/")
        );
        assert_eq!(check_path(Some(&student), "/etudiant"), RouteDecision::Allow);
    }

    #[test]
    fn test_public_routes_are_open() {
        assert_eq!(check_path(None, "/login"), RouteDecision::Allow);
        assert_eq!(check_path(None, "/"), RouteDecision::Allow);
    }

    #[test]
    fn test_prefix_match_requires_segment_boundary() {
        assert_eq!(role_for_path("/administration"), None);
        assert_eq!(role_for_path("/admin/rapports"), Some(Role::Administration));
        assert_eq!(
            check_path(Some(&admin_demo()), "/administration"),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_decision_wire_format() {
        let json = serde_json::to_value(RouteDecision::Redirect("/login")).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "redirect", "to": "/login"}));
        let json = serde_json::to_value(RouteDecision::Allow).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "allow"}));
    }
}
