//! Continuity-of-care exports.
//!
//! A stored export summarises both histories and the latest exam, so reading one needs the
//! timeline and medical-resume categories for its patient.

use super::{grant_id, open_disclosure, parse_id, ActingUser};
use crate::dto::{ContinuityExportReq, DisclosureQuery, ErrorRes};
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use erm_core::models::ContinuityExport;

#[utoipa::path(
    post,
    path = "/continuity-exports",
    request_body = ContinuityExportReq,
    responses(
        (status = 201, description = "Export persisted with its audit entry"),
        (status = 400, description = "Blank facility or invalid body", body = ErrorRes),
        (status = 404, description = "Unknown patient or user", body = ErrorRes)
    )
)]
/// Builds a continuity-of-care export on behalf of the acting user.
///
/// An exporter outside the patient's home unit gets a `Lainnya` grant written in the same
/// commit as the export.
pub async fn create_export(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(req): Json<ContinuityExportReq>,
) -> ApiResult<(StatusCode, Json<ContinuityExport>)> {
    let request = req.into_transfer_request(actor)?;
    let export = state.core.exporter().export_for_transfer_with(request)?;
    Ok((StatusCode::CREATED, Json(export)))
}

#[utoipa::path(
    get,
    path = "/continuity-exports/{id}",
    params(("id" = String, Path, description = "Export id"), DisclosureQuery),
    responses(
        (status = 200, description = "Stored export"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the export", body = ErrorRes),
        (status = 404, description = "Unknown export", body = ErrorRes)
    )
)]
pub async fn get_export(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<ContinuityExport>> {
    let export = state
        .core
        .disclosure()
        .export(actor, parse_id(&id)?, grant_id(&query)?)?;
    Ok(Json(export))
}

#[utoipa::path(
    get,
    path = "/continuity-exports/{id}/document",
    params(("id" = String, Path, description = "Export id"), DisclosureQuery),
    responses(
        (status = 200, description = "Printable transfer document", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the export", body = ErrorRes),
        (status = 404, description = "Unknown export", body = ErrorRes)
    )
)]
pub async fn export_document(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<impl IntoResponse> {
    let export = state
        .core
        .disclosure()
        .export(actor, parse_id(&id)?, grant_id(&query)?)?;
    let document = state.core.exporter().render_full_document(&export);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        document,
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/continuity-exports",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Exports for the patient"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the exports", body = ErrorRes)
    )
)]
pub async fn patient_exports(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<ContinuityExport>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.exports()?))
}
