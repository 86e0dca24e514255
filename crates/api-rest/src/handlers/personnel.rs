use super::{parse_id, ActingUser};
use crate::dto::{CreatePatientReq, CreateUserReq, ErrorRes, TransferPatientReq};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use erm_core::models::{AuditEntry, Patient, User};

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient created"),
        (status = 400, description = "Invalid body or duplicate NRP", body = ErrorRes),
        (status = 401, description = "Missing x-user-id", body = ErrorRes)
    )
)]
pub async fn create_patient(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(req): Json<CreatePatientReq>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state
        .core
        .directory()
        .create_patient(req.into_new_patient()?, actor)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses((status = 200, description = "All patients"))
)]
pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.core.directory().patients()?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient"),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.core.directory().patient(parse_id(&id)?)?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/unit",
    params(("id" = String, Path, description = "Patient id")),
    request_body = TransferPatientReq,
    responses(
        (status = 200, description = "Patient moved to a new home unit"),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Moves a patient to a new home unit. Existing records keep their authoring facility.
pub async fn transfer_patient(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(req): Json<TransferPatientReq>,
) -> ApiResult<Json<Patient>> {
    let patient = state
        .core
        .directory()
        .transfer_patient(parse_id(&id)?, &req.unit, actor)?;
    Ok(Json(patient))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid body", body = ErrorRes),
        (status = 401, description = "Missing x-user-id once users exist", body = ErrorRes),
        (status = 404, description = "Unknown acting user", body = ErrorRes)
    )
)]
/// Registers a user. Only the first user may be created without `x-user-id`; it is
/// recorded as its own creator.
pub async fn create_user(
    State(state): State<AppState>,
    actor: Option<ActingUser>,
    Json(req): Json<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .core
        .directory()
        .create_user(req.into_new_user()?, actor.map(|a| a.0))?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users"))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.core.directory().users()?))
}

#[utoipa::path(
    post,
    path = "/users/{id}/login",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 201, description = "Login recorded in the audit log"),
        (status = 401, description = "Missing x-user-id", body = ErrorRes),
        (status = 403, description = "x-user-id is not the user logging in", body = ErrorRes),
        (status = 404, description = "Unknown user", body = ErrorRes)
    )
)]
/// Records a login. Users only record their own.
pub async fn record_login(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<AuditEntry>)> {
    let id = parse_id(&id)?;
    if id != actor {
        return Err(ApiError::Forbidden(format!(
            "{actor} cannot record a login for {id}"
        )));
    }
    let user = state.core.directory().user(id)?;
    let entry = state.core.audit().record_login(user.id)?;
    Ok((StatusCode::CREATED, Json(entry)))
}
