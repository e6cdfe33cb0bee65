//! Role-based authorization for routes already behind [`super::gate::require_auth`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::error::ApiError;
use super::principal::{AdminRole, Principal, Role, StoreRole, UserRole};

/// Every role of every kind.
pub const ANY_ROLE: &[Role] = &[
    Role::Admin(AdminRole::SubAdmin),
    Role::Admin(AdminRole::NormalAdmin),
    Role::Admin(AdminRole::SuperAdmin),
    Role::Store(StoreRole::StoreAdmin),
    Role::Store(StoreRole::StoreManager),
    Role::Store(StoreRole::StoreStaff),
    Role::User(UserRole::NormalUser),
    Role::User(UserRole::PremiumUser),
];

/// Provisioning stores.
pub const STORE_SIGNUP: &[Role] = &[Role::SUPER_ADMIN];

/// Reading store records.
pub const STORE_READ: &[Role] = &[Role::STORE_ADMIN, Role::SUPER_ADMIN];

/// Reading user records.
pub const USER_READ: &[Role] = &[Role::SUPER_ADMIN, Role::NORMAL_ADMIN, Role::STORE_ADMIN];

#[must_use]
pub fn authorize(principal: &Principal, allowed: &[Role]) -> bool {
    allowed.contains(&principal.role)
}

/// Middleware: 403 unless the attached principal's role is in `allowed`.
/// A missing principal means `require_auth` did not run first and yields 401.
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        return ApiError::missing_principal().into_response();
    };
    if !authorize(principal, allowed) {
        debug!("Role {} not permitted here", principal.role);
        return ApiError::forbidden().into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::principal::PrincipalKind;
    use anyhow::Result;
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            kind: role.kind(),
            email: "p@x.com".to_string(),
            full_name: "P".to_string(),
            role,
            password_hash: None,
            is_email_verified: true,
            google_id: None,
            otp: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn any_role_lists_every_role() {
        assert_eq!(ANY_ROLE.len(), Role::all().count());
        assert!(Role::all().all(|role| ANY_ROLE.contains(&role)));
    }

    #[test]
    fn authorize_is_membership() {
        // Every subset of the role universe against every role.
        let roles: Vec<Role> = Role::all().collect();
        for mask in 0_u32..(1 << roles.len()) {
            let allowed: Vec<Role> = roles
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, role)| *role)
                .collect();
            for role in &roles {
                assert_eq!(
                    authorize(&principal(*role), &allowed),
                    allowed.contains(role)
                );
            }
        }
    }

    #[test]
    fn empty_policy_denies_everyone() {
        assert!(!authorize(&principal(Role::SUPER_ADMIN), &[]));
    }

    #[test]
    fn store_signup_is_super_admin_only() {
        assert!(authorize(&principal(Role::SUPER_ADMIN), STORE_SIGNUP));
        assert!(!authorize(&principal(Role::NORMAL_ADMIN), STORE_SIGNUP));
        assert!(!authorize(&principal(Role::STORE_ADMIN), STORE_SIGNUP));
        assert!(!authorize(
            &principal(PrincipalKind::User.default_role()),
            STORE_SIGNUP
        ));
    }

    fn app(attached: Option<Principal>) -> Router {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(STORE_SIGNUP, require_roles));
        match attached {
            Some(principal) => router.layer(Extension(principal)),
            None => router,
        }
    }

    async fn status(app: Router) -> Result<StatusCode> {
        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty())?)
            .await?;
        Ok(response.status())
    }

    #[tokio::test]
    async fn middleware_allows_listed_role() -> Result<()> {
        assert_eq!(
            status(app(Some(principal(Role::SUPER_ADMIN)))).await?,
            StatusCode::OK
        );
        Ok(())
    }

    #[tokio::test]
    async fn middleware_forbids_other_roles() -> Result<()> {
        assert_eq!(
            status(app(Some(principal(Role::STORE_ADMIN)))).await?,
            StatusCode::FORBIDDEN
        );
        Ok(())
    }

    #[tokio::test]
    async fn middleware_without_principal_is_unauthorized() -> Result<()> {
        assert_eq!(status(app(None)).await?, StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
