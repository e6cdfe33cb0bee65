//! The caller's own profile, for any authenticated role.

use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
};

use super::auth::error::ErrorBody;
use super::auth::principal::{Principal, PrincipalView};
use super::auth::types::ApiResponse;

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "The authenticated principal", body = ApiResponse<PrincipalView>),
        (status = 401, description = "Missing, expired or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn get_me(Extension(principal): Extension<Principal>) -> Response {
    ApiResponse::ok("Profile retrieved successfully!", principal.view()).into_response()
}
