use super::parse_id;
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use erm_core::models::AuditEntry;

#[utoipa::path(
    get,
    path = "/audit-logs",
    responses((status = 200, description = "Every audit entry in insertion order"))
)]
pub async fn logs(State(state): State<AppState>) -> ApiResult<Json<Vec<AuditEntry>>> {
    Ok(Json(state.core.audit().logs()?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/audit-logs",
    params(("id" = String, Path, description = "User id")),
    responses((status = 200, description = "Entries written by the user"))
)]
pub async fn user_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    Ok(Json(state.core.audit().logs_by_user(parse_id(&id)?)?))
}
