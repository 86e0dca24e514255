//! Continuity-of-care exports.
//!
//! An export freezes a patient's cross-facility history at the moment of a transfer: the
//! rendered summary, the newest diagnoses and procedures, and the latest exam result. It is
//! written once and never modified. Re-exporting creates a new record, and later edits or
//! deletions of the underlying encounters leave existing exports untouched.
//!
//! Exporting reads the whole timeline. When the exporting user works outside the patient's
//! home unit the export commits an access grant alongside itself, so every cross-facility
//! read stays backed by a grant.

mod document;
mod summary;

pub use document::render_full_document;
pub use summary::render_summary;

use crate::constants::CONTINUITY_EXPORTS_COLLECTION;
use crate::error::EntityKind;
use crate::models::{
    AccessRequest, AuditAction, AuditEntity, ContinuityExport, DataCategory, JustificationCode,
    LatestExamResult, TransferRequest,
};
use crate::repositories::audit::audit_meta;
use crate::repositories::{AccessService, AuditLog, CoreContext, PersonnelDirectory, RecordStore};
use crate::storage::{with_retry, Collection};
use crate::timeline::TimelineAggregator;
use crate::{ErmError, ErmResult};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct ContinuityExporter {
    ctx: CoreContext,
    audit: AuditLog,
    directory: PersonnelDirectory,
    records: RecordStore,
    timeline: TimelineAggregator,
    access: AccessService,
    exports: Collection<ContinuityExport>,
}

impl ContinuityExporter {
    pub(crate) fn new(
        ctx: CoreContext,
        audit: AuditLog,
        directory: PersonnelDirectory,
        records: RecordStore,
        timeline: TimelineAggregator,
        access: AccessService,
    ) -> Self {
        let exports = ctx.collection(CONTINUITY_EXPORTS_COLLECTION);
        Self {
            ctx,
            audit,
            directory,
            records,
            timeline,
            access,
            exports,
        }
    }

    pub fn export_for_transfer(
        &self,
        patient_id: RecordId,
        origin_facility: &str,
        destination_facility: &str,
        user_id: RecordId,
        transfer_note: Option<String>,
    ) -> ErmResult<ContinuityExport> {
        self.export_for_transfer_with(TransferRequest {
            patient_id,
            origin_facility: origin_facility.to_string(),
            destination_facility: destination_facility.to_string(),
            user_id,
            transfer_note,
            allergies: None,
            medications: Vec::new(),
        })
    }

    /// Builds and persists an export, with optional allergy and medication details.
    ///
    /// # Errors
    ///
    /// - [`ErmError::EmptyText`] if either facility is blank.
    /// - [`ErmError::NotFound`] if the patient or user does not exist.
    pub fn export_for_transfer_with(&self, request: TransferRequest) -> ErmResult<ContinuityExport> {
        let origin = NonEmptyText::new(&request.origin_facility)?;
        let destination = NonEmptyText::new(&request.destination_facility)?;
        let patient = self.directory.patient(request.patient_id)?;
        let user = self.directory.user(request.user_id)?;

        // The grant is stamped before the export so it never postdates the read.
        let cross_facility = user.unit.as_ref() != Some(&patient.unit);
        let grant = if cross_facility {
            let note = format!("Ekspor continuity of care ke {destination}");
            let request = AccessRequest::new(
                user.id,
                patient.id,
                [
                    DataCategory::Timeline,
                    DataCategory::SupportingResults,
                    DataCategory::MedicalResume,
                ],
            )?
            .justify(JustificationCode::Lainnya, Some(note))?;
            Some(self.access.prepare(request, &user, &patient)?)
        } else {
            None
        };

        let id = RecordId::new();
        let exported_at = self.ctx.clock.now();
        let history_limit = self.ctx.cfg.history_limit();

        let export = with_retry("export_for_transfer", || {
            let timeline = self.timeline.timeline(patient.id)?;
            let latest_exam = self.records.latest_periodic_exam(patient.id)?;
            let mut diagnoses = self.timeline.diagnosis_history(patient.id)?;
            diagnoses.truncate(history_limit);
            let mut procedures = self.timeline.procedures_history(patient.id)?;
            procedures.truncate(history_limit);

            let export = ContinuityExport {
                id,
                patient_id: patient.id,
                origin_facility: origin.clone(),
                destination_facility: destination.clone(),
                exported_at,
                summary: render_summary(
                    origin.as_str(),
                    exported_at,
                    &timeline,
                    latest_exam.as_ref(),
                    self.ctx.cfg.summary_visit_limit(),
                ),
                diagnoses,
                procedures,
                medications: request.medications.clone(),
                allergies: NonEmptyText::from_optional(request.allergies.as_deref()),
                latest_exam: latest_exam.as_ref().map(|e| LatestExamResult::from(&e.findings)),
                transfer_note: NonEmptyText::from_optional(request.transfer_note.as_deref()),
                user_id: user.id,
                created_at: exported_at,
            };

            let mut entries = Vec::new();
            let mut writes = Vec::new();
            if let Some((grant, entry)) = &grant {
                writes.push(self.access.stage(grant)?);
                entries.push(entry.clone());
            }
            entries.push(self.audit.entry(
                user.id,
                AuditAction::Create,
                AuditEntity::RekamMedis,
                Some(export.id),
                audit_meta! {
                    "personelId" => patient.id.to_string(),
                    "fasilitasAsal" => export.origin_facility.as_str(),
                    "fasilitasTujuan" => export.destination_facility.as_str(),
                },
            ));

            let mut snapshot = self.exports.load()?;
            snapshot.items.push(export.clone());
            writes.push(self.exports.stage(&snapshot)?);
            writes.push(self.audit.stage_append(entries)?);

            self.ctx.store.commit(&writes)?;
            Ok(export)
        })?;

        tracing::info!(
            export_id = %export.id,
            patient_id = %export.patient_id,
            destination = %export.destination_facility,
            cross_facility,
            "continuity export created"
        );
        Ok(export)
    }

    pub fn export(&self, id: RecordId) -> ErmResult<ContinuityExport> {
        self.exports
            .all()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ErmError::not_found(EntityKind::ContinuityExport, id))
    }

    pub fn exports_by_patient(&self, patient_id: RecordId) -> ErmResult<Vec<ContinuityExport>> {
        Ok(self
            .exports
            .all()?
            .into_iter()
            .filter(|e| e.patient_id == patient_id)
            .collect())
    }

    pub fn render_full_document(&self, export: &ContinuityExport) -> String {
        render_full_document(export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AuditEntity, Conclusion, EncounterPatch, EncounterType, ExamCategory, ExamFindings,
        MedicationEntry, NewEncounter, NewPeriodicExam,
    };
    use crate::test_support::{at, fixture};
    use chrono::Duration;

    #[test]
    fn export_survives_encounter_deletion() {
        let fx = fixture();
        let records = fx.core.records();
        let mut new = NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum);
        new.diagnosis = Some("Gastritis".into());
        let encounter = records.create_encounter(new, fx.home_user.id).unwrap();

        let export = fx
            .core
            .exporter()
            .export_for_transfer(
                fx.patient.id,
                "Lanud Halim",
                "Lanud Iswahjudi",
                fx.home_user.id,
                Some("Mutasi".into()),
            )
            .unwrap();

        records
            .update_encounter(
                encounter.id,
                EncounterPatch {
                    diagnosis: Some("Dispepsia".into()),
                    ..Default::default()
                },
                fx.home_user.id,
            )
            .unwrap();
        records.delete_encounter(encounter.id, fx.home_user.id).unwrap();

        let stored = fx.core.exporter().export(export.id).unwrap();
        assert_eq!(stored, export);
        assert_eq!(stored.diagnoses[0].diagnosis, "Gastritis");
        assert!(stored.summary.contains("     Diagnosa: Gastritis"));
    }

    #[test]
    fn export_truncates_to_newest_twenty() {
        let fx = fixture();
        let records = fx.core.records();
        let start = at("2024-01-01");
        for day in 0..25 {
            let mut new = NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Lanjutan);
            new.visit_date = Some(start + Duration::days(day));
            new.diagnosis = Some(format!("Diagnosa {day}"));
            new.treatment = Some(format!("Tindakan {day}"));
            records.create_encounter(new, fx.home_user.id).unwrap();
        }

        let export = fx
            .core
            .exporter()
            .export_for_transfer(fx.patient.id, "Lanud Halim", "RSAU Esnawan", fx.home_user.id, None)
            .unwrap();

        assert_eq!(export.diagnoses.len(), 20);
        assert_eq!(export.procedures.len(), 20);
        assert_eq!(export.diagnoses[0].diagnosis, "Diagnosa 24");
        assert_eq!(export.diagnoses[19].diagnosis, "Diagnosa 5");
        assert!(export.summary.contains("  Total Kunjungan: 25"));
        assert!(export.summary.contains("  ... dan 20 kunjungan lainnya"));
    }

    #[test]
    fn export_records_latest_exam_and_audits_as_medical_record() {
        let fx = fixture();
        let mut findings = ExamFindings::new(2024, ExamCategory::Periodik);
        findings.conclusion = Some(Conclusion::Layak);
        fx.core
            .records()
            .create_periodic_exam(
                NewPeriodicExam {
                    patient_id: fx.patient.id,
                    unit: "Lanud Halim".into(),
                    findings,
                    doctor_id: None,
                    status: None,
                },
                fx.home_user.id,
            )
            .unwrap();

        let export = fx
            .core
            .exporter()
            .export_for_transfer_with(TransferRequest {
                patient_id: fx.patient.id,
                origin_facility: "Lanud Halim".into(),
                destination_facility: "Lanud Iswahjudi".into(),
                user_id: fx.home_user.id,
                transfer_note: None,
                allergies: Some("Penisilin".into()),
                medications: vec![MedicationEntry {
                    name: NonEmptyText::new("Omeprazol").unwrap(),
                    dose: "20 mg".into(),
                    period: "2 minggu".into(),
                }],
            })
            .unwrap();

        let latest = export.latest_exam.as_ref().unwrap();
        assert_eq!(latest.year, 2024);
        assert_eq!(latest.conclusion, "Layak");
        assert_eq!(latest.recommendation, "-");
        assert!(export.summary.contains("RIKKES TERAKHIR:\n  Tahun: 2024\n  Jenis: Periodik"));
        assert_eq!(export.allergies.as_ref().unwrap(), "Penisilin");

        let entry = fx.core.audit().logs().unwrap().pop().unwrap();
        assert_eq!(entry.entity, AuditEntity::RekamMedis);
        assert_eq!(entry.entity_id, Some(export.id));
        assert_eq!(entry.meta["fasilitasTujuan"], "Lanud Iswahjudi");

        // Home-unit export needs no grant.
        assert!(fx.core.access().grants_by_patient(fx.patient.id).unwrap().is_empty());
        let doc = fx.core.exporter().render_full_document(&export);
        assert!(doc.contains("ALERGI\n"));
    }

    #[test]
    fn cross_facility_export_writes_a_grant_first() {
        let fx = fixture();
        let export = fx
            .core
            .exporter()
            .export_for_transfer(fx.patient.id, "Lanud Iswahjudi", "Lanud Iswahjudi", fx.other_user.id, None)
            .unwrap();

        let grants = fx.core.access().grants_by_user(fx.other_user.id).unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].code, JustificationCode::Lainnya);
        assert!(grants[0].covers(DataCategory::Timeline));
        assert!(grants[0].accessed_at <= export.exported_at);

        let logs = fx.core.audit().logs().unwrap();
        let tail: Vec<_> = logs[logs.len() - 2..].iter().map(|e| e.entity).collect();
        assert_eq!(tail, vec![AuditEntity::AksesFasilitas, AuditEntity::RekamMedis]);
    }

    #[test]
    fn re_export_creates_a_new_record() {
        let fx = fixture();
        let exporter = fx.core.exporter();
        let first = exporter
            .export_for_transfer(fx.patient.id, "Lanud Halim", "RSAU Esnawan", fx.home_user.id, None)
            .unwrap();
        let second = exporter
            .export_for_transfer(fx.patient.id, "Lanud Halim", "RSAU Esnawan", fx.home_user.id, None)
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(exporter.exports_by_patient(fx.patient.id).unwrap().len(), 2);
        assert!(matches!(
            exporter.export(RecordId::new()),
            Err(ErmError::NotFound { .. })
        ));
    }
}
