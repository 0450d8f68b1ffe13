use auth_identity::{EntityKind, Role};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use clinical_records::{NewQuery, PatientQuery, QueryReply};

use super::{check_identifier, created};
use crate::error::{api_list, api_success, ApiJson, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::EhrServer;

pub async fn create_query(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    ApiJson(input): ApiJson<NewQuery>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PatientQuery>>)> {
    let query = server.records.create_query(ctx.principal_id(), input).await?;
    Ok(created(api_success(query).with_message("Query sent successfully")))
}

/// Patients see what they asked, doctors what they were asked
pub async fn list_queries(
    State(server): State<EhrServer>,
    ctx: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<PatientQuery>>>> {
    let queries = match ctx.role {
        Role::Patient => server.records.list_queries_for_patient(ctx.principal_id()).await?,
        Role::Doctor => server.records.list_queries_for_doctor(ctx.principal_id()).await?,
    };
    Ok(Json(api_list(queries)))
}

pub async fn reply_to_query(
    State(server): State<EhrServer>,
    ctx: AuthContext,
    Path(query_id): Path<String>,
    ApiJson(reply): ApiJson<QueryReply>,
) -> ApiResult<Json<ApiResponse<PatientQuery>>> {
    check_identifier(EntityKind::Query, &query_id)?;
    let query = server
        .records
        .answer_query(ctx.principal_id(), &query_id, reply)
        .await?;
    Ok(Json(api_success(query).with_message("Reply sent successfully")))
}
