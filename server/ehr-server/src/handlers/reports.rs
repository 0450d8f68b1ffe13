use axum::{extract::State, http::StatusCode, Json};
use clinical_records::{NewReport, ScanReport};

use super::created;
use crate::error::{api_list, api_success, ApiJson, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

pub async fn create_report(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(input): ApiJson<NewReport>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ScanReport>>)> {
    let report = server.records.create_report(ctx.principal_id(), input).await?;
    Ok(created(api_success(report).with_message("Report recorded successfully")))
}

pub async fn list_reports(
    State(server): State<EhrServer>,
    ctx: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<ScanReport>>>> {
    let reports = server.records.list_reports_for_patient(ctx.principal_id()).await?;
    Ok(Json(api_list(reports)))
}
