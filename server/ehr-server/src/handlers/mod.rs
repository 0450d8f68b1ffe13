//! HTTP handlers, one module per resource

pub mod doctors;
pub mod health;
pub mod patients;
pub mod queries;
pub mod reports;
pub mod visits;

use auth_identity::{EntityKind, Principal, Role};
use axum::{http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::error::{api_message, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

/// Login body shared by both roles. Patients sign in with their patient ID or
/// mobile number, doctors with their email or phone number.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// Issue a token for a freshly registered or authenticated principal
fn with_session<T>(
    server: &EhrServer,
    principal: &Principal,
    envelope: ApiResponse<T>,
) -> ApiResult<ApiResponse<T>> {
    let issued = server.tokens.issue(principal.id(), principal.role())?;
    Ok(envelope.with_token(issued.token))
}

pub(crate) fn created<T>(response: ApiResponse<T>) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(response))
}

pub(crate) fn register(
    server: &EhrServer,
    principal: Principal,
) -> ApiResult<(StatusCode, Json<ApiResponse<auth_identity::PrincipalProfile>>)> {
    let envelope = api_success(principal.profile()).with_message("Registration successful");
    let response = with_session(server, &principal, envelope)?;
    Ok(created(response))
}

pub(crate) async fn login(
    server: &EhrServer,
    role: Role,
    request: LoginRequest,
) -> ApiResult<Json<ApiResponse<auth_identity::PrincipalProfile>>> {
    request.validate()?;

    let principal = server
        .identity
        .authenticate(role, &request.identifier, &request.password)
        .await?;

    let envelope = api_success(principal.profile()).with_message("Login successful");
    Ok(Json(with_session(server, &principal, envelope)?))
}

pub(crate) async fn change_password(
    server: &EhrServer,
    ctx: &AuthContext,
    request: ChangePasswordRequest,
) -> ApiResult<Json<ApiResponse<()>>> {
    request.validate()?;

    server
        .identity
        .change_password(
            ctx.role,
            ctx.principal_id(),
            &request.current_password,
            &request.new_password,
        )
        .await?;

    Ok(Json(api_message("Password updated successfully")))
}

/// Reject a path identifier that cannot name a record of `kind`
pub(crate) fn check_identifier(kind: EntityKind, candidate: &str) -> ApiResult<()> {
    if kind.matches(candidate) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("Invalid {kind} ID format")))
    }
}
