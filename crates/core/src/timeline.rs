//! Cross-facility timeline of a patient's encounters.
//!
//! Every view here merges encounters from every authoring facility. Ordering is by date,
//! newest first, using a stable sort so records with equal dates keep insertion order. An
//! unknown patient yields empty results rather than an error.

use crate::models::{DiagnosisEntry, Encounter, EncounterType, ProcedureEntry};
use crate::repositories::RecordStore;
use crate::ErmResult;
use chrono::{DateTime, NaiveDate, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: RecordId,
    pub date: DateTime<Utc>,
    pub encounter_type: EncounterType,
    pub facility: NonEmptyText,
    /// The complaint, or the encounter type label when no complaint was recorded.
    pub description: String,
    pub diagnosis: Option<NonEmptyText>,
    pub treatment: Option<NonEmptyText>,
}

impl From<&Encounter> for TimelineEvent {
    fn from(e: &Encounter) -> Self {
        Self {
            id: e.id,
            date: e.visit_date,
            encounter_type: e.encounter_type,
            facility: e.unit.clone(),
            description: e
                .complaint
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| e.encounter_type.label().to_string()),
            diagnosis: e.diagnosis.clone(),
            treatment: e.treatment.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportingResultEntry {
    pub encounter_id: RecordId,
    pub kind: NonEmptyText,
    pub result: NonEmptyText,
    pub date: NaiveDate,
    pub facility: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisitStats {
    pub total_visits: usize,
    pub facilities: usize,
    pub latest_visit: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct TimelineAggregator {
    records: RecordStore,
}

impl TimelineAggregator {
    pub(crate) fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Encounters newest first.
    fn sorted_encounters(&self, patient_id: RecordId) -> ErmResult<Vec<Encounter>> {
        let mut encounters = self.records.encounters_by_patient(patient_id)?;
        encounters.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        tracing::debug!(patient_id = %patient_id, count = encounters.len(), "timeline loaded");
        Ok(encounters)
    }

    pub fn timeline(&self, patient_id: RecordId) -> ErmResult<Vec<TimelineEvent>> {
        Ok(self
            .sorted_encounters(patient_id)?
            .iter()
            .map(TimelineEvent::from)
            .collect())
    }

    pub fn diagnosis_history(&self, patient_id: RecordId) -> ErmResult<Vec<DiagnosisEntry>> {
        Ok(self
            .sorted_encounters(patient_id)?
            .into_iter()
            .filter_map(|e| {
                e.diagnosis.map(|diagnosis| DiagnosisEntry {
                    diagnosis,
                    date: e.visit_date,
                    facility: e.unit,
                })
            })
            .collect())
    }

    pub fn procedures_history(&self, patient_id: RecordId) -> ErmResult<Vec<ProcedureEntry>> {
        Ok(self
            .sorted_encounters(patient_id)?
            .into_iter()
            .filter_map(|e| {
                e.treatment.map(|procedure| ProcedureEntry {
                    procedure,
                    date: e.visit_date,
                    facility: e.unit,
                })
            })
            .collect())
    }

    /// Supporting results from every encounter, newest result date first.
    pub fn supporting_results(
        &self,
        patient_id: RecordId,
    ) -> ErmResult<Vec<SupportingResultEntry>> {
        let mut entries: Vec<SupportingResultEntry> = self
            .sorted_encounters(patient_id)?
            .into_iter()
            .flat_map(|e| {
                let encounter_id = e.id;
                let facility = e.unit;
                e.supporting_results
                    .into_iter()
                    .map(move |r| SupportingResultEntry {
                        encounter_id,
                        kind: r.kind,
                        result: r.result,
                        date: r.date,
                        facility: facility.clone(),
                    })
            })
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    pub fn visit_stats(&self, patient_id: RecordId) -> ErmResult<VisitStats> {
        let encounters = self.sorted_encounters(patient_id)?;
        let facilities: BTreeSet<&str> = encounters.iter().map(|e| e.unit.as_str()).collect();

        Ok(VisitStats {
            total_visits: encounters.len(),
            facilities: facilities.len(),
            latest_visit: encounters.first().map(|e| e.visit_date),
        })
    }
}
