//! The single path through which patient data reaches a user.
//!
//! A user whose unit is the patient's current home unit reads freely. Anyone else needs an
//! [`AccessGrant`] for that patient, and each read checks that some grant held by the user
//! covers the category being read. The grant was written (with its audit entry) before the
//! disclosure, so it is the evidentiary record of the read.

use crate::continuity::ContinuityExporter;
use crate::models::{
    AccessGrant, ContinuityExport, DataCategory, DiagnosisEntry, Encounter, Patient, PeriodicExam, ProcedureEntry,
    User,
};
use crate::repositories::{AccessService, PersonnelDirectory, RecordStore};
use crate::timeline::{SupportingResultEntry, TimelineAggregator, TimelineEvent, VisitStats};
use crate::{ErmError, ErmResult};
use erm_uuid::RecordId;

/// Why a disclosure is permitted.
#[derive(Clone, Debug, PartialEq)]
pub enum DisclosureBasis {
    /// The user works at the patient's home unit.
    HomeFacility,
    /// Grants held by the user for this patient, newest first. Never empty.
    Grants(Vec<AccessGrant>),
}

#[derive(Clone, Debug)]
pub struct DisclosureGate {
    directory: PersonnelDirectory,
    access: AccessService,
    records: RecordStore,
    timeline: TimelineAggregator,
    exporter: ContinuityExporter,
}

impl DisclosureGate {
    pub(crate) fn new(
        directory: PersonnelDirectory,
        access: AccessService,
        records: RecordStore,
        timeline: TimelineAggregator,
        exporter: ContinuityExporter,
    ) -> Self {
        Self {
            directory,
            access,
            records,
            timeline,
            exporter,
        }
    }

    /// Opens a disclosure of `patient_id`'s data to `user_id`.
    ///
    /// With `grant_id` only that grant is considered; otherwise every grant the user holds
    /// for the patient is.
    ///
    /// # Errors
    ///
    /// - [`ErmError::NotFound`] if the user or patient does not exist.
    /// - [`ErmError::NoAccessGrant`] if the user is outside the home unit and holds no
    ///   matching grant.
    pub fn open(
        &self,
        user_id: RecordId,
        patient_id: RecordId,
        grant_id: Option<RecordId>,
    ) -> ErmResult<Disclosure<'_>> {
        let user = self.directory.user(user_id)?;
        let patient = self.directory.patient(patient_id)?;

        let basis = if is_home_facility(&user, &patient) {
            DisclosureBasis::HomeFacility
        } else {
            let mut grants = self.access.grants_for(user_id, patient_id)?;
            if let Some(grant_id) = grant_id {
                grants.retain(|g| g.id == grant_id);
            }
            if grants.is_empty() {
                tracing::warn!(user_id = %user_id, patient_id = %patient_id, "disclosure refused: no grant");
                return Err(ErmError::NoAccessGrant {
                    user_id,
                    patient_id,
                });
            }
            DisclosureBasis::Grants(grants)
        };

        Ok(Disclosure {
            gate: self,
            user,
            patient,
            basis,
        })
    }

    /// One encounter, disclosed under the timeline category of its patient.
    pub fn encounter(
        &self,
        user_id: RecordId,
        encounter_id: RecordId,
        grant_id: Option<RecordId>,
    ) -> ErmResult<Encounter> {
        let encounter = self.records.encounter(encounter_id)?;
        self.open(user_id, encounter.patient_id, grant_id)?
            .authorise(DataCategory::Timeline)?;
        Ok(encounter)
    }

    /// One periodic exam, disclosed under the medical-resume category of its patient.
    pub fn periodic_exam(
        &self,
        user_id: RecordId,
        exam_id: RecordId,
        grant_id: Option<RecordId>,
    ) -> ErmResult<PeriodicExam> {
        let exam = self.records.periodic_exam(exam_id)?;
        self.open(user_id, exam.patient_id, grant_id)?
            .authorise(DataCategory::MedicalResume)?;
        Ok(exam)
    }

    /// A stored continuity export. Its summary carries both histories and exam results.
    pub fn export(
        &self,
        user_id: RecordId,
        export_id: RecordId,
        grant_id: Option<RecordId>,
    ) -> ErmResult<ContinuityExport> {
        let export = self.exporter.export(export_id)?;
        self.open(user_id, export.patient_id, grant_id)?
            .authorise_export()?;
        Ok(export)
    }
}

fn is_home_facility(user: &User, patient: &Patient) -> bool {
    user.unit.as_ref() == Some(&patient.unit)
}

/// An opened disclosure. Each read re-checks its category against the basis.
#[derive(Debug)]
pub struct Disclosure<'a> {
    gate: &'a DisclosureGate,
    user: User,
    patient: Patient,
    basis: DisclosureBasis,
}

impl Disclosure<'_> {
    pub fn basis(&self) -> &DisclosureBasis {
        &self.basis
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    fn authorise(&self, category: DataCategory) -> ErmResult<()> {
        match &self.basis {
            DisclosureBasis::HomeFacility => {}
            DisclosureBasis::Grants(grants) => {
                let Some(grant) = grants.iter().find(|g| g.covers(category)) else {
                    return Err(ErmError::CategoryNotGranted {
                        grant_id: grants[0].id,
                        category,
                    });
                };
                tracing::info!(
                    user_id = %self.user.id,
                    patient_id = %self.patient.id,
                    grant_id = %grant.id,
                    category = %category,
                    "cross-facility disclosure"
                );
            }
        }
        Ok(())
    }

    fn authorise_export(&self) -> ErmResult<()> {
        self.authorise(DataCategory::Timeline)?;
        self.authorise(DataCategory::MedicalResume)
    }

    pub fn timeline(&self) -> ErmResult<Vec<TimelineEvent>> {
        self.authorise(DataCategory::Timeline)?;
        self.gate.timeline.timeline(self.patient.id)
    }

    pub fn diagnosis_history(&self) -> ErmResult<Vec<DiagnosisEntry>> {
        self.authorise(DataCategory::Timeline)?;
        self.gate.timeline.diagnosis_history(self.patient.id)
    }

    pub fn procedures_history(&self) -> ErmResult<Vec<ProcedureEntry>> {
        self.authorise(DataCategory::Timeline)?;
        self.gate.timeline.procedures_history(self.patient.id)
    }

    pub fn visit_stats(&self) -> ErmResult<VisitStats> {
        self.authorise(DataCategory::Timeline)?;
        self.gate.timeline.visit_stats(self.patient.id)
    }

    pub fn supporting_results(&self) -> ErmResult<Vec<SupportingResultEntry>> {
        self.authorise(DataCategory::SupportingResults)?;
        self.gate.timeline.supporting_results(self.patient.id)
    }

    /// Resume of the latest periodic exam, if any.
    pub fn resume(&self) -> ErmResult<Option<String>> {
        self.authorise(DataCategory::MedicalResume)?;
        Ok(self
            .gate
            .records
            .latest_periodic_exam(self.patient.id)?
            .map(|exam| exam.resume))
    }

    pub fn exports(&self) -> ErmResult<Vec<ContinuityExport>> {
        self.authorise_export()?;
        self.gate.exporter.exports_by_patient(self.patient.id)
    }

    /// Every periodic exam of the patient, newest year first.
    pub fn periodic_exam_history(&self) -> ErmResult<Vec<PeriodicExam>> {
        self.authorise(DataCategory::MedicalResume)?;
        self.gate.records.periodic_exam_history(self.patient.id)
    }
}
