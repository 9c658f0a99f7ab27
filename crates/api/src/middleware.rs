use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::context::PrincipalContext;
use crate::errors::GuardError;
use crate::guard::{AuthorizationGuard, RequiredPermission, ResolvedRole};

/// Middleware state: the guard plus the permission one route requires.
#[derive(Debug, Clone)]
pub struct GuardedRoute {
    pub guard: AuthorizationGuard,
    pub required: Arc<RequiredPermission>,
}

impl GuardedRoute {
    pub fn new(guard: AuthorizationGuard, required: RequiredPermission) -> Self {
        Self {
            guard,
            required: Arc::new(required),
        }
    }
}

/// Enforce `route.required` before the handler runs.
///
/// Use with `axum::middleware::from_fn_with_state` as a `route_layer`. On
/// success the [`Grant`](orgguard_auth::Grant) is left in request extensions
/// for handlers that honor `ou_required`/`tag_required`.
pub async fn guard_middleware(
    State(route): State<GuardedRoute>,
    mut req: Request,
    next: Next,
) -> Result<Response, GuardError> {
    let principal = req.extensions().get::<PrincipalContext>().copied();
    let mut resolved = req.extensions().get::<ResolvedRole>().cloned();

    let grant = route
        .guard
        .check(&route.required, principal.as_ref(), &mut resolved)?;

    if let Some(resolved) = resolved {
        req.extensions_mut().insert(resolved);
    }
    req.extensions_mut().insert(grant);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Extension, Json, Router,
        body::{Body, to_bytes},
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use orgguard_auth::{AuthorizationEngine, Flag, Grant, PermissionNode, Role, RoleSource, RoleStore};
    use orgguard_core::{RoleId, UserId};
    use orgguard_infra::{InMemoryRoleStore, InMemoryUserDirectory};

    use super::*;

    struct CountingRoles {
        inner: InMemoryRoleStore,
        loads: AtomicUsize,
    }

    impl RoleSource for CountingRoles {
        fn role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.role(role_id)
        }
    }

    struct Harness {
        guard: AuthorizationGuard,
        roles: Arc<CountingRoles>,
        clerk: UserId,
    }

    fn harness() -> Harness {
        orgguard_observability::init();

        let roles = Arc::new(CountingRoles {
            inner: InMemoryRoleStore::new(),
            loads: AtomicUsize::new(0),
        });
        let users = Arc::new(InMemoryUserDirectory::new());

        let role = Role::new("clerk").with_permissions(vec![
            PermissionNode::checkbox("DATA", false, true, false, false).with_ou_required(true),
            PermissionNode::radio("REPORTS", true),
        ]);
        let clerk = UserId::new();
        users.assign(clerk, role.id);
        roles.inner.save(role).unwrap();

        let engine = AuthorizationEngine::new(users, roles.clone());
        Harness {
            guard: AuthorizationGuard::new(Arc::new(engine)),
            roles,
            clerk,
        }
    }

    async fn grant_handler(Extension(grant): Extension<Grant>) -> Json<Grant> {
        Json(grant)
    }

    fn guarded(guard: &AuthorizationGuard, required: RequiredPermission) -> Router {
        Router::new()
            .route("/", get(grant_handler))
            .route_layer(from_fn_with_state(
                GuardedRoute::new(guard.clone(), required),
                guard_middleware,
            ))
    }

    fn request(user: Option<UserId>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(user) = user {
            builder = builder.extension(PrincipalContext::new(user));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn allowed_request_reaches_handler_with_grant() {
        let h = harness();
        let app = guarded(&h.guard, RequiredPermission::new("DATA", Flag::Read));

        let response = app.oneshot(request(Some(h.clerk))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["kind"], "node");
        assert_eq!(body["unit"], "DATA");
        assert_eq!(body["ou_required"], true);
    }

    #[tokio::test]
    async fn denied_request_gets_forbidden_body() {
        let h = harness();
        let app = guarded(&h.guard, RequiredPermission::new("DATA", Flag::Delete));

        let response = app.oneshot(request(Some(h.clerk))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let h = harness();
        let app = guarded(&h.guard, RequiredPermission::new("DATA", Flag::Read));

        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn unguarded_route_passes_without_principal() {
        let h = harness();
        let app = guarded(&h.guard, RequiredPermission::unguarded());

        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["kind"], "unguarded");
    }

    #[tokio::test]
    async fn stacked_guards_share_one_role_load() {
        let h = harness();
        let app = Router::new()
            .route("/", get(grant_handler))
            .route_layer(from_fn_with_state(
                GuardedRoute::new(h.guard.clone(), RequiredPermission::new("DATA", Flag::Read)),
                guard_middleware,
            ))
            .route_layer(from_fn_with_state(
                GuardedRoute::new(h.guard.clone(), RequiredPermission::new("REPORTS", Flag::Create)),
                guard_middleware,
            ));

        let response = app.oneshot(request(Some(h.clerk))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.roles.loads.load(Ordering::SeqCst), 1);
    }
}
