//! Route handlers, grouped by the core service they call.

pub mod access;
pub mod audit;
pub mod continuity;
pub mod personnel;
pub mod records;

use crate::dto::{DisclosureQuery, HealthRes};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;
use erm_core::{Disclosure, ErmError, RecordId};

/// Header carrying the acting user's id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The user on whose behalf the request runs, taken from [`ACTOR_HEADER`].
#[derive(Clone, Copy, Debug)]
pub struct ActingUser(pub RecordId);

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::MissingActor(format!("missing {ACTOR_HEADER} header")))?;
        let value = value
            .to_str()
            .map_err(|_| ApiError::MissingActor(format!("{ACTOR_HEADER} is not valid text")))?;
        let id = RecordId::parse(value)
            .map_err(|e| ApiError::MissingActor(format!("{ACTOR_HEADER}: {e}")))?;
        Ok(Self(id))
    }
}

/// Parses a path or body id.
pub(crate) fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| ApiError::Core(ErmError::from(e)))
}

/// The grant a disclosure is restricted to, if the caller named one.
pub(crate) fn grant_id(query: &DisclosureQuery) -> ApiResult<Option<RecordId>> {
    query.grant_id.as_deref().map(parse_id).transpose()
}

/// Opens a disclosure of `patient`'s data to the acting user.
pub(crate) fn open_disclosure<'a>(
    state: &'a AppState,
    actor: RecordId,
    patient: &str,
    query: &DisclosureQuery,
) -> ApiResult<Disclosure<'a>> {
    Ok(state
        .core
        .disclosure()
        .open(actor, parse_id(patient)?, grant_id(query)?)?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "BINPROFKES E-RM REST API is alive".into(),
    })
}
