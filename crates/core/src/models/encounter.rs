use chrono::{DateTime, NaiveDate, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};

labelled_enum! {
    /// Reason for a clinical visit.
    pub enum EncounterType {
        /// General consultation.
        Umum => "Umum",
        /// Periodic fitness exam.
        Rikkes => "Rikkes",
        /// Career-development exam.
        Dikbangum => "Dikbangum",
        /// Follow-up.
        Lanjutan => "Lanjutan",
        /// Referral.
        Rujukan => "Rujukan",
    }
}

labelled_enum! {
    pub enum EncounterStatus {
        Draft => "Draft",
        Final => "Final",
        Selesai => "Selesai",
    }
}

/// One supporting test result attached to an encounter (lab, imaging, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportingResult {
    pub kind: NonEmptyText,
    pub result: NonEmptyText,
    pub date: NaiveDate,
}

/// A clinical visit.
///
/// `unit` is the authoring facility and never changes after creation, even if the patient
/// is later transferred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub unit: NonEmptyText,
    pub encounter_type: EncounterType,
    pub visit_date: DateTime<Utc>,
    pub complaint: Option<NonEmptyText>,
    pub diagnosis: Option<NonEmptyText>,
    pub treatment: Option<NonEmptyText>,
    #[serde(default)]
    pub supporting_results: Vec<SupportingResult>,
    pub status: EncounterStatus,
    pub doctor_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewEncounter {
    pub patient_id: RecordId,
    pub unit: String,
    pub encounter_type: EncounterType,
    /// Defaults to the creation time.
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complaint: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub supporting_results: Vec<SupportingResult>,
    #[serde(default)]
    pub status: Option<EncounterStatus>,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
}

impl NewEncounter {
    pub fn new(patient_id: RecordId, unit: impl Into<String>, encounter_type: EncounterType) -> Self {
        Self {
            patient_id,
            unit: unit.into(),
            encounter_type,
            visit_date: None,
            complaint: None,
            diagnosis: None,
            treatment: None,
            supporting_results: Vec::new(),
            status: None,
            doctor_id: None,
        }
    }
}

/// Partial update of an encounter.
///
/// `None` leaves a field unchanged. For the free-text fields `Some("")` clears the value.
/// The patient and authoring unit cannot be patched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncounterPatch {
    #[serde(default)]
    pub encounter_type: Option<EncounterType>,
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complaint: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub supporting_results: Option<Vec<SupportingResult>>,
    #[serde(default)]
    pub status: Option<EncounterStatus>,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
}

impl Encounter {
    pub(crate) fn apply(&mut self, patch: EncounterPatch, now: DateTime<Utc>) {
        if let Some(encounter_type) = patch.encounter_type {
            self.encounter_type = encounter_type;
        }
        if let Some(visit_date) = patch.visit_date {
            self.visit_date = visit_date;
        }
        if let Some(complaint) = patch.complaint {
            self.complaint = NonEmptyText::from_optional(Some(complaint));
        }
        if let Some(diagnosis) = patch.diagnosis {
            self.diagnosis = NonEmptyText::from_optional(Some(diagnosis));
        }
        if let Some(treatment) = patch.treatment {
            self.treatment = NonEmptyText::from_optional(Some(treatment));
        }
        if let Some(results) = patch.supporting_results {
            self.supporting_results = results;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(doctor_id) = patch.doctor_id {
            self.doctor_id = Some(doctor_id);
        }
        self.updated_at = now;
    }
}
