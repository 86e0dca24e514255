//! Access grants.

use super::{parse_id, ActingUser};
use crate::dto::{AccessGrantReq, ErrorRes, LimitQuery};
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use erm_core::models::{AccessGrant, AccessStats, JustificationCode};

#[utoipa::path(
    post,
    path = "/access-grants",
    request_body = AccessGrantReq,
    responses(
        (status = 201, description = "Grant and its audit entry written"),
        (status = 400, description = "Invalid justification or categories", body = ErrorRes),
        (status = 404, description = "Unknown user or patient", body = ErrorRes)
    )
)]
/// Requests cross-facility access for the acting user.
pub async fn request_access(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(req): Json<AccessGrantReq>,
) -> ApiResult<(StatusCode, Json<AccessGrant>)> {
    let categories = req.parse_categories()?;
    let code: JustificationCode = req.code.parse()?;
    let grant = state.core.access().request_access(
        actor,
        parse_id(&req.patient_id)?,
        code,
        req.note,
        categories,
    )?;
    Ok((StatusCode::CREATED, Json(grant)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/access-grants",
    params(("id" = String, Path, description = "Patient id"), LimitQuery),
    responses((status = 200, description = "Grants for the patient, newest first"))
)]
pub async fn patient_grants(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<AccessGrant>>> {
    let grants = state
        .core
        .access()
        .recent_grants(parse_id(&id)?, query.limit)?;
    Ok(Json(grants))
}

#[utoipa::path(
    get,
    path = "/users/{id}/access-grants",
    params(("id" = String, Path, description = "User id")),
    responses((status = 200, description = "Grants held by the user"))
)]
pub async fn user_grants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AccessGrant>>> {
    Ok(Json(state.core.access().grants_by_user(parse_id(&id)?)?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/access-stats",
    params(("id" = String, Path, description = "Patient id")),
    responses((status = 200, description = "Grant counts by reason and target facility"))
)]
pub async fn access_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccessStats>> {
    Ok(Json(state.core.access().access_stats(parse_id(&id)?)?))
}
