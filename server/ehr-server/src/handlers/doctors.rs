use auth_identity::{DoctorProfile, DoctorUpdate, NewDoctor, Principal, PrincipalProfile, Role};
use axum::{extract::State, http::StatusCode, Json};

use super::{ChangePasswordRequest, LoginRequest};
use crate::error::{api_success, ApiError, ApiJson, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

pub async fn signup(
    State(server): State<EhrServer>,
    ApiJson(input): ApiJson<NewDoctor>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PrincipalProfile>>)> {
    let doctor = server.identity.register_doctor(input).await?;
    super::register(&server, Principal::Doctor(doctor))
}

pub async fn login(
    State(server): State<EhrServer>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<PrincipalProfile>>> {
    super::login(&server, Role::Doctor, request).await
}

pub async fn get_profile(ctx: AuthContext) -> ApiResult<Json<ApiResponse<DoctorProfile>>> {
    let doctor = ctx
        .doctor()
        .ok_or_else(|| ApiError::forbidden(format!("Role '{}' is not authorized to access this resource", ctx.role)))?;
    Ok(Json(api_success(DoctorProfile::from(doctor))))
}

pub async fn update_profile(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(update): ApiJson<DoctorUpdate>,
) -> ApiResult<Json<ApiResponse<DoctorProfile>>> {
    let doctor = server
        .identity
        .update_doctor_profile(ctx.principal_id(), update)
        .await?;
    Ok(Json(
        api_success(DoctorProfile::from(&doctor)).with_message("Profile updated successfully"),
    ))
}

pub async fn change_password(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    super::change_password(&server, &ctx, request).await
}
