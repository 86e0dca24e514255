//! Encounter and periodic-exam CRUD plus the patient-scoped read views.
//!
//! Every read runs through the disclosure gate on behalf of the acting user. Outside the
//! patient's home unit it needs a grant covering the category: diagnoses, procedures and
//! visit statistics fall under the timeline, exams under the medical resume.

use super::{grant_id, open_disclosure, parse_id, ActingUser};
use crate::dto::{DisclosureQuery, ErrorRes, ResumeRes};
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use erm_core::models::{
    DiagnosisEntry, Encounter, EncounterPatch, ExamPatch, NewEncounter, NewPeriodicExam,
    PeriodicExam, ProcedureEntry,
};
use erm_core::{SupportingResultEntry, TimelineEvent, VisitStats};

// ============================================================================
// ENCOUNTERS
// ============================================================================

#[utoipa::path(
    post,
    path = "/encounters",
    responses(
        (status = 201, description = "Encounter created"),
        (status = 400, description = "Invalid body", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Creates an encounter. The body is a `NewEncounter` JSON object.
pub async fn create_encounter(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(new): Json<NewEncounter>,
) -> ApiResult<(StatusCode, Json<Encounter>)> {
    let encounter = state.core.records().create_encounter(new, actor)?;
    Ok((StatusCode::CREATED, Json(encounter)))
}

#[utoipa::path(
    get,
    path = "/encounters/{id}",
    params(("id" = String, Path, description = "Encounter id"), DisclosureQuery),
    responses(
        (status = 200, description = "Encounter"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the timeline", body = ErrorRes),
        (status = 404, description = "Unknown encounter", body = ErrorRes)
    )
)]
pub async fn get_encounter(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Encounter>> {
    let encounter = state
        .core
        .disclosure()
        .encounter(actor, parse_id(&id)?, grant_id(&query)?)?;
    Ok(Json(encounter))
}

#[utoipa::path(
    put,
    path = "/encounters/{id}",
    params(("id" = String, Path, description = "Encounter id")),
    responses(
        (status = 200, description = "Encounter updated"),
        (status = 400, description = "Invalid patch", body = ErrorRes),
        (status = 404, description = "Unknown encounter", body = ErrorRes),
        (status = 409, description = "Concurrent modification", body = ErrorRes)
    )
)]
/// Applies an `EncounterPatch`. Unit and patient cannot be patched.
pub async fn update_encounter(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(patch): Json<EncounterPatch>,
) -> ApiResult<Json<Encounter>> {
    let encounter = state
        .core
        .records()
        .update_encounter(parse_id(&id)?, patch, actor)?;
    Ok(Json(encounter))
}

#[utoipa::path(
    delete,
    path = "/encounters/{id}",
    params(("id" = String, Path, description = "Encounter id")),
    responses(
        (status = 204, description = "Encounter deleted"),
        (status = 404, description = "Unknown encounter", body = ErrorRes)
    )
)]
pub async fn delete_encounter(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.core.records().delete_encounter(parse_id(&id)?, actor)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// PERIODIC EXAMS
// ============================================================================

#[utoipa::path(
    post,
    path = "/periodic-exams",
    responses(
        (status = 201, description = "Periodic exam created with its generated resume"),
        (status = 400, description = "Invalid body", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Creates a periodic exam. A `resume` field in the body is rejected.
pub async fn create_periodic_exam(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(new): Json<NewPeriodicExam>,
) -> ApiResult<(StatusCode, Json<PeriodicExam>)> {
    let exam = state.core.records().create_periodic_exam(new, actor)?;
    Ok((StatusCode::CREATED, Json(exam)))
}

#[utoipa::path(
    get,
    path = "/periodic-exams/{id}",
    params(("id" = String, Path, description = "Periodic exam id"), DisclosureQuery),
    responses(
        (status = 200, description = "Periodic exam"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the medical resume", body = ErrorRes),
        (status = 404, description = "Unknown periodic exam", body = ErrorRes)
    )
)]
pub async fn get_periodic_exam(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<PeriodicExam>> {
    let exam = state
        .core
        .disclosure()
        .periodic_exam(actor, parse_id(&id)?, grant_id(&query)?)?;
    Ok(Json(exam))
}

#[utoipa::path(
    put,
    path = "/periodic-exams/{id}",
    params(("id" = String, Path, description = "Periodic exam id")),
    responses(
        (status = 200, description = "Periodic exam updated, resume regenerated"),
        (status = 400, description = "Invalid patch", body = ErrorRes),
        (status = 404, description = "Unknown periodic exam", body = ErrorRes),
        (status = 409, description = "Concurrent modification", body = ErrorRes)
    )
)]
pub async fn update_periodic_exam(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(patch): Json<ExamPatch>,
) -> ApiResult<Json<PeriodicExam>> {
    let exam = state
        .core
        .records()
        .update_periodic_exam(parse_id(&id)?, patch, actor)?;
    Ok(Json(exam))
}

#[utoipa::path(
    delete,
    path = "/periodic-exams/{id}",
    params(("id" = String, Path, description = "Periodic exam id")),
    responses(
        (status = 204, description = "Periodic exam deleted"),
        (status = 404, description = "Unknown periodic exam", body = ErrorRes)
    )
)]
pub async fn delete_periodic_exam(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .core
        .records()
        .delete_periodic_exam(parse_id(&id)?, actor)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/periodic-exams",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Periodic exams, newest year first"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the medical resume", body = ErrorRes)
    )
)]
pub async fn periodic_exam_history(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<PeriodicExam>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.periodic_exam_history()?))
}

// ============================================================================
// PATIENT VIEWS
// ============================================================================

#[utoipa::path(
    get,
    path = "/patients/{id}/timeline",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Encounters from every facility, newest first"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the timeline", body = ErrorRes)
    )
)]
pub async fn timeline(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<TimelineEvent>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.timeline()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/diagnoses",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Diagnosis history, newest first"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the timeline", body = ErrorRes)
    )
)]
pub async fn diagnoses(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<DiagnosisEntry>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.diagnosis_history()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/procedures",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Procedure history, newest first"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the timeline", body = ErrorRes)
    )
)]
pub async fn procedures(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<ProcedureEntry>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.procedures_history()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/supporting-results",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Supporting results, newest first"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the supporting results", body = ErrorRes)
    )
)]
pub async fn supporting_results(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<Vec<SupportingResultEntry>>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.supporting_results()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/stats",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Visit statistics"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the timeline", body = ErrorRes)
    )
)]
pub async fn visit_stats(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<VisitStats>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(disclosure.visit_stats()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/resume",
    params(("id" = String, Path, description = "Patient id"), DisclosureQuery),
    responses(
        (status = 200, description = "Latest periodic-exam resume", body = ResumeRes),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "No grant covers the medical resume", body = ErrorRes)
    )
)]
pub async fn resume(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> ApiResult<Json<ResumeRes>> {
    let disclosure = open_disclosure(&state, actor, &id, &query)?;
    Ok(Json(ResumeRes {
        resume: disclosure.resume()?,
    }))
}
