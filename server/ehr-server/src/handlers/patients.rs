use auth_identity::{NewPatient, PatientProfile, PatientUpdate, Principal, PrincipalProfile, Role};
use axum::{extract::State, http::StatusCode, Json};

use super::{ChangePasswordRequest, LoginRequest};
use crate::error::{api_success, ApiError, ApiJson, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

pub async fn signup(
    State(server): State<EhrServer>,
    ApiJson(input): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PrincipalProfile>>)> {
    let patient = server.identity.register_patient(input).await?;
    super::register(&server, Principal::Patient(patient))
}

pub async fn login(
    State(server): State<EhrServer>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<PrincipalProfile>>> {
    super::login(&server, Role::Patient, request).await
}

pub async fn get_profile(ctx: AuthContext) -> ApiResult<Json<ApiResponse<PatientProfile>>> {
    let patient = ctx
        .patient()
        .ok_or_else(|| ApiError::forbidden(format!("Role '{}' is not authorized to access this resource", ctx.role)))?;
    Ok(Json(api_success(PatientProfile::from(patient))))
}

pub async fn update_profile(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> ApiResult<Json<ApiResponse<PatientProfile>>> {
    let patient = server
        .identity
        .update_patient_profile(ctx.principal_id(), update)
        .await?;
    Ok(Json(
        api_success(PatientProfile::from(&patient)).with_message("Profile updated successfully"),
    ))
}

pub async fn change_password(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    super::change_password(&server, &ctx, request).await
}
