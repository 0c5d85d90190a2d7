//! Role guards for the browser-facing routes.
//!
//! `shared::session::authenticate` runs first and stores the `Principal`;
//! these guards only compare its role against the allow-list of the route
//! group.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use shared::model::{Employee, Project, Resource, Role, TaskItem};
use shared::session::Principal;
use std::future::Future;
use std::pin::Pin;

type GuardFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Allowed roles per collection.
pub const POLICY: &[(&str, &[Role])] = &[
    (Employee::COLLECTION, &[Role::Admin]),
    (Project::COLLECTION, &[Role::Admin, Role::Manager]),
    (
        TaskItem::COLLECTION,
        &[Role::Admin, Role::Manager, Role::Employee],
    ),
];

/// Unknown collections allow nobody.
pub fn roles_for(collection: &str) -> &'static [Role] {
    POLICY
        .iter()
        .find(|(name, _)| *name == collection)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

/// Middleware factory: 401 without a principal, 403 when its role is not in
/// `roles`.
pub fn require_roles(roles: &'static [Role]) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let Some(principal) = req.extensions().get::<Principal>() else {
                return StatusCode::UNAUTHORIZED.into_response();
            };

            if !roles.contains(&principal.role) {
                tracing::debug!(
                    user = %principal.user,
                    role = principal.role.as_str(),
                    path = %req.uri().path(),
                    "Role not allowed"
                );
                return StatusCode::FORBIDDEN.into_response();
            }

            next.run(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn guarded(roles: &'static [Role], principal: Option<Principal>) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(require_roles(roles)))
            .layer(axum::middleware::from_fn(
                move |mut req: Request, next: Next| {
                    let principal = principal.clone();
                    async move {
                        if let Some(principal) = principal {
                            req.extensions_mut().insert(principal);
                        }
                        next.run(req).await
                    }
                },
            ))
    }

    async fn status_for(roles: &'static [Role], role: Option<Role>) -> StatusCode {
        let principal = role.map(|role| Principal {
            user: "someone".into(),
            role,
        });
        let request = http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();

        guarded(roles, principal)
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(roles_for("employees"), &[Role::Admin]);
        assert_eq!(roles_for("projects"), &[Role::Admin, Role::Manager]);
        assert_eq!(roles_for("task-items"), &Role::ALL);
        assert!(roles_for("payroll").is_empty());
    }

    #[tokio::test]
    async fn test_require_roles() {
        let employees = roles_for("employees");
        assert_eq!(status_for(employees, Some(Role::Admin)).await, StatusCode::OK);
        assert_eq!(
            status_for(employees, Some(Role::Manager)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_for(employees, None).await, StatusCode::UNAUTHORIZED);

        let tasks = roles_for("task-items");
        assert_eq!(status_for(tasks, Some(Role::Employee)).await, StatusCode::OK);
    }
}
