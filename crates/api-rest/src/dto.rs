//! Request and response bodies owned by the HTTP layer.
//!
//! Enumerations arrive as their Indonesian labels and are parsed by the core, so an
//! unknown value is a `400` before anything is written.

use erm_core::models::{DataCategory, MedicationEntry, NewPatient, NewUser, TransferRequest};
use erm_core::{ErmResult, NonEmptyText, RecordId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// `validation`, `access_denied`, `not_found`, `conflict` or `persistence`.
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub nrp: String,
    pub name: String,
    /// `Tamtama`, `Bintara` or `Perwira`.
    pub rank: String,
    #[serde(default)]
    pub corps: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub position: Option<String>,
}

impl CreatePatientReq {
    pub fn into_new_patient(self) -> ErmResult<NewPatient> {
        Ok(NewPatient {
            nrp: self.nrp,
            name: self.name,
            rank: self.rank.parse()?,
            corps: self.corps,
            unit: self.unit,
            position: self.position,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl CreateUserReq {
    pub fn into_new_user(self) -> ErmResult<NewUser> {
        Ok(NewUser {
            name: self.name,
            role: self.role.parse()?,
            unit: self.unit,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferPatientReq {
    pub unit: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessGrantReq {
    pub patient_id: String,
    /// `Rikkes`, `Dikbangum`, `Rujukan`, `Lanjutan` or `Lainnya`.
    pub code: String,
    /// Required when `code` is `Lainnya`.
    #[serde(default)]
    pub note: Option<String>,
    /// Any of `timeline`, `hasil_penunjang`, `resume_medis`.
    pub categories: Vec<String>,
}

impl AccessGrantReq {
    pub fn parse_categories(&self) -> ErmResult<Vec<DataCategory>> {
        self.categories.iter().map(|c| c.parse()).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicationReq {
    pub name: String,
    pub dose: String,
    pub period: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContinuityExportReq {
    pub patient_id: String,
    pub origin_facility: String,
    pub destination_facility: String,
    #[serde(default)]
    pub transfer_note: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Vec<MedicationReq>,
}

impl ContinuityExportReq {
    pub fn into_transfer_request(self, user_id: RecordId) -> ErmResult<TransferRequest> {
        let medications = self
            .medications
            .into_iter()
            .map(|m| {
                Ok(MedicationEntry {
                    name: NonEmptyText::new(&m.name)?,
                    dose: m.dose,
                    period: m.period,
                })
            })
            .collect::<ErmResult<Vec<_>>>()?;

        Ok(TransferRequest {
            patient_id: RecordId::parse(&self.patient_id)?,
            origin_facility: self.origin_facility,
            destination_facility: self.destination_facility,
            user_id,
            transfer_note: self.transfer_note,
            allergies: self.allergies,
            medications,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResumeRes {
    /// Resume of the latest periodic exam; absent when the patient has none.
    pub resume: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LimitQuery {
    /// Maximum number of grants; defaults to the configured recent-grant limit.
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DisclosureQuery {
    /// Restrict the disclosure to one grant.
    pub grant_id: Option<String>,
}
