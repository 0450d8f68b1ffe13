use auth_identity::{EntityKind, Role};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use clinical_records::{NewVisit, Visit};

use super::{check_identifier, created};
use crate::error::{api_list, api_success, ApiJson, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

pub async fn create_visit(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(input): ApiJson<NewVisit>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Visit>>)> {
    let visit = server.records.create_visit(ctx.principal_id(), input).await?;
    Ok(created(api_success(visit).with_message("Visit recorded successfully")))
}

/// Patients see their own visits, doctors the visits they authored
pub async fn list_visits(
    State(server): State<EhrServer>,
    ctx: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Visit>>>> {
    let visits = match ctx.role {
        Role::Patient => server.records.list_visits_for_patient(ctx.principal_id()).await?,
        Role::Doctor => server.records.list_visits_by_doctor(ctx.principal_id()).await?,
    };
    Ok(Json(api_list(visits)))
}

pub async fn get_visit(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    Path(visit_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Visit>>> {
    check_identifier(EntityKind::Visit, &visit_id)?;
    let visit = server
        .records
        .get_visit(ctx.role, ctx.principal_id(), &visit_id)
        .await?;
    Ok(Json(api_success(visit)))
}
