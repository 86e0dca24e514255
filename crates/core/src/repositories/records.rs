//! Encounters and periodic exams.
//!
//! Records are keyed by patient id, never by the patient's current unit, so a transfer does
//! not hide earlier records. Each mutation commits the record and its audit entry in one
//! batch. Deletes are hard deletes; the audit entry is the only durable trace.

use super::audit::audit_meta;
use super::{AuditLog, CoreContext, PersonnelDirectory};
use crate::constants::{ENCOUNTERS_COLLECTION, PERIODIC_EXAMS_COLLECTION};
use crate::error::EntityKind;
use crate::models::{
    AuditAction, AuditEntity, Encounter, EncounterPatch, EncounterStatus, EncounterType,
    ExamPatch, ExamStatus, NewEncounter, NewPeriodicExam, PeriodicExam,
};
use crate::storage::{with_retry, Collection, Snapshot};
use crate::{resume, ErmError, ErmResult};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct RecordStore {
    ctx: CoreContext,
    audit: AuditLog,
    directory: PersonnelDirectory,
    encounters: Collection<Encounter>,
    exams: Collection<PeriodicExam>,
}

fn position<T>(
    snapshot: &Snapshot<T>,
    entity: EntityKind,
    id: RecordId,
    record_id: impl Fn(&T) -> RecordId,
) -> ErmResult<usize> {
    snapshot
        .items
        .iter()
        .position(|item| record_id(item) == id)
        .ok_or_else(|| ErmError::not_found(entity, id))
}

impl RecordStore {
    pub(crate) fn new(ctx: CoreContext, audit: AuditLog, directory: PersonnelDirectory) -> Self {
        let encounters = ctx.collection(ENCOUNTERS_COLLECTION);
        let exams = ctx.collection(PERIODIC_EXAMS_COLLECTION);
        Self {
            ctx,
            audit,
            directory,
            encounters,
            exams,
        }
    }

    /// Commits `snapshot` together with one audit entry.
    fn commit_with_audit<T>(
        &self,
        collection: &Collection<T>,
        snapshot: &Snapshot<T>,
        entry: crate::models::AuditEntry,
    ) -> ErmResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ctx.store.commit(&[
            collection.stage(snapshot)?,
            self.audit.stage_append(vec![entry])?,
        ])
    }

    // ========================================================================
    // ENCOUNTERS
    // ========================================================================

    /// Creates an encounter authored at `new.unit`.
    ///
    /// # Errors
    ///
    /// - [`ErmError::EmptyText`] if the unit is blank.
    /// - [`ErmError::NotFound`] if the patient or the acting user does not exist.
    pub fn create_encounter(&self, new: NewEncounter, actor: RecordId) -> ErmResult<Encounter> {
        let unit = NonEmptyText::new(&new.unit)?;
        self.directory.patient(new.patient_id)?;
        self.directory.user(actor)?;

        let now = self.ctx.clock.now();
        let encounter = Encounter {
            id: RecordId::new(),
            patient_id: new.patient_id,
            unit,
            encounter_type: new.encounter_type,
            visit_date: new.visit_date.unwrap_or(now),
            complaint: NonEmptyText::from_optional(new.complaint),
            diagnosis: NonEmptyText::from_optional(new.diagnosis),
            treatment: NonEmptyText::from_optional(new.treatment),
            supporting_results: new.supporting_results,
            status: new.status.unwrap_or(EncounterStatus::Draft),
            doctor_id: new.doctor_id,
            created_at: now,
            updated_at: now,
        };
        let entry = self.audit.entry(
            actor,
            AuditAction::Create,
            AuditEntity::RekamMedis,
            Some(encounter.id),
            audit_meta! {
                "personelId" => encounter.patient_id.to_string(),
                "jenisPemeriksaan" => encounter.encounter_type.label(),
            },
        );

        with_retry("create_encounter", || {
            let mut snapshot = self.encounters.load()?;
            snapshot.items.push(encounter.clone());
            self.commit_with_audit(&self.encounters, &snapshot, entry.clone())
        })?;

        tracing::info!(
            encounter_id = %encounter.id,
            patient_id = %encounter.patient_id,
            unit = %encounter.unit,
            "encounter created"
        );
        Ok(encounter)
    }

    pub fn update_encounter(
        &self,
        id: RecordId,
        patch: EncounterPatch,
        actor: RecordId,
    ) -> ErmResult<Encounter> {
        self.directory.user(actor)?;
        let updated = with_retry("update_encounter", || {
            let mut snapshot = self.encounters.load()?;
            let index = position(&snapshot, EntityKind::Encounter, id, |e| e.id)?;

            let record = &mut snapshot.items[index];
            record.apply(patch.clone(), self.ctx.clock.now());
            let updated = record.clone();

            let entry = self.audit.entry(
                actor,
                AuditAction::Update,
                AuditEntity::RekamMedis,
                Some(id),
                audit_meta! { "personelId" => updated.patient_id.to_string() },
            );
            self.commit_with_audit(&self.encounters, &snapshot, entry)?;
            Ok(updated)
        })?;

        tracing::info!(encounter_id = %id, "encounter updated");
        Ok(updated)
    }

    pub fn delete_encounter(&self, id: RecordId, actor: RecordId) -> ErmResult<()> {
        self.directory.user(actor)?;
        with_retry("delete_encounter", || {
            let mut snapshot = self.encounters.load()?;
            let index = position(&snapshot, EntityKind::Encounter, id, |e| e.id)?;
            let removed = snapshot.items.remove(index);

            let entry = self.audit.entry(
                actor,
                AuditAction::Delete,
                AuditEntity::RekamMedis,
                Some(id),
                audit_meta! { "personelId" => removed.patient_id.to_string() },
            );
            self.commit_with_audit(&self.encounters, &snapshot, entry)
        })?;

        tracing::info!(encounter_id = %id, "encounter deleted");
        Ok(())
    }

    pub fn encounter(&self, id: RecordId) -> ErmResult<Encounter> {
        self.encounters
            .all()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ErmError::not_found(EntityKind::Encounter, id))
    }

    /// Every encounter for the patient, from every facility, in insertion order.
    pub fn encounters_by_patient(&self, patient_id: RecordId) -> ErmResult<Vec<Encounter>> {
        Ok(self
            .encounters
            .all()?
            .into_iter()
            .filter(|e| e.patient_id == patient_id)
            .collect())
    }

    /// Most recent encounter by visit date, optionally restricted to one type.
    pub fn latest_encounter(
        &self,
        patient_id: RecordId,
        encounter_type: Option<EncounterType>,
    ) -> ErmResult<Option<Encounter>> {
        Ok(self
            .encounters_by_patient(patient_id)?
            .into_iter()
            .filter(|e| encounter_type.map_or(true, |t| e.encounter_type == t))
            .reduce(|best, e| if e.visit_date > best.visit_date { e } else { best }))
    }

    // ========================================================================
    // PERIODIC EXAMS
    // ========================================================================

    /// Creates a periodic exam. The resume is generated from the findings.
    pub fn create_periodic_exam(
        &self,
        new: NewPeriodicExam,
        actor: RecordId,
    ) -> ErmResult<PeriodicExam> {
        let unit = NonEmptyText::new(&new.unit)?;
        self.directory.patient(new.patient_id)?;
        self.directory.user(actor)?;

        let now = self.ctx.clock.now();
        let exam = PeriodicExam {
            id: RecordId::new(),
            patient_id: new.patient_id,
            unit,
            resume: resume::generate(&new.findings),
            findings: new.findings,
            doctor_id: new.doctor_id,
            status: new.status.unwrap_or(ExamStatus::Draft),
            created_at: now,
            updated_at: now,
        };
        let entry = self.audit.entry(
            actor,
            AuditAction::Create,
            AuditEntity::RekamRikkes,
            Some(exam.id),
            audit_meta! {
                "personelId" => exam.patient_id.to_string(),
                "tahunRikkes" => exam.findings.year,
            },
        );

        with_retry("create_periodic_exam", || {
            let mut snapshot = self.exams.load()?;
            snapshot.items.push(exam.clone());
            self.commit_with_audit(&self.exams, &snapshot, entry.clone())
        })?;

        tracing::info!(exam_id = %exam.id, patient_id = %exam.patient_id, year = exam.findings.year, "periodic exam created");
        Ok(exam)
    }

    /// Applies `patch` and regenerates the resume before persisting.
    pub fn update_periodic_exam(
        &self,
        id: RecordId,
        patch: ExamPatch,
        actor: RecordId,
    ) -> ErmResult<PeriodicExam> {
        self.directory.user(actor)?;
        let updated = with_retry("update_periodic_exam", || {
            let mut snapshot = self.exams.load()?;
            let index = position(&snapshot, EntityKind::PeriodicExam, id, |e| e.id)?;

            let record = &mut snapshot.items[index];
            record.apply(patch.clone(), self.ctx.clock.now());
            let updated = record.clone();

            let entry = self.audit.entry(
                actor,
                AuditAction::Update,
                AuditEntity::RekamRikkes,
                Some(id),
                audit_meta! {
                    "personelId" => updated.patient_id.to_string(),
                    "tahunRikkes" => updated.findings.year,
                },
            );
            self.commit_with_audit(&self.exams, &snapshot, entry)?;
            Ok(updated)
        })?;

        tracing::info!(exam_id = %id, "periodic exam updated");
        Ok(updated)
    }

    pub fn delete_periodic_exam(&self, id: RecordId, actor: RecordId) -> ErmResult<()> {
        self.directory.user(actor)?;
        with_retry("delete_periodic_exam", || {
            let mut snapshot = self.exams.load()?;
            let index = position(&snapshot, EntityKind::PeriodicExam, id, |e| e.id)?;
            let removed = snapshot.items.remove(index);

            let entry = self.audit.entry(
                actor,
                AuditAction::Delete,
                AuditEntity::RekamRikkes,
                Some(id),
                audit_meta! {
                    "personelId" => removed.patient_id.to_string(),
                    "tahunRikkes" => removed.findings.year,
                },
            );
            self.commit_with_audit(&self.exams, &snapshot, entry)
        })?;

        tracing::info!(exam_id = %id, "periodic exam deleted");
        Ok(())
    }

    pub fn periodic_exam(&self, id: RecordId) -> ErmResult<PeriodicExam> {
        self.exams
            .all()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ErmError::not_found(EntityKind::PeriodicExam, id))
    }

    pub fn periodic_exams_by_patient(&self, patient_id: RecordId) -> ErmResult<Vec<PeriodicExam>> {
        Ok(self
            .exams
            .all()?
            .into_iter()
            .filter(|e| e.patient_id == patient_id)
            .collect())
    }

    /// The exam with the highest year; among equal years the most recently updated one.
    pub fn latest_periodic_exam(&self, patient_id: RecordId) -> ErmResult<Option<PeriodicExam>> {
        Ok(self
            .periodic_exams_by_patient(patient_id)?
            .into_iter()
            .max_by_key(|e| (e.findings.year, e.updated_at)))
    }

    pub fn periodic_exam_by_year(
        &self,
        patient_id: RecordId,
        year: i32,
    ) -> ErmResult<Option<PeriodicExam>> {
        Ok(self
            .periodic_exams_by_patient(patient_id)?
            .into_iter()
            .filter(|e| e.findings.year == year)
            .max_by_key(|e| e.updated_at))
    }

    /// All exams for the patient, newest year first.
    pub fn periodic_exam_history(&self, patient_id: RecordId) -> ErmResult<Vec<PeriodicExam>> {
        let mut exams = self.periodic_exams_by_patient(patient_id)?;
        exams.sort_by(|a, b| {
            b.findings
                .year
                .cmp(&a.findings.year)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        Ok(exams)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{
        AuditAction, AuditEntity, Conclusion, EncounterPatch, EncounterType, ExamCategory,
        ExamFindings, ExamPatch, NewEncounter, NewPeriodicExam,
    };
    use crate::error::EntityKind;
    use crate::test_support::fixture;
    use crate::{ErmError, ErrorKind};
    use erm_uuid::RecordId;

    #[test]
    fn create_encounter_writes_record_and_audit_together() {
        let fx = fixture();
        let mut new = NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum);
        new.complaint = Some("Demam".into());

        let created = fx
            .core
            .records()
            .create_encounter(new, fx.home_user.id)
            .unwrap();

        let logs = fx.core.audit().logs().unwrap();
        let entry = logs.last().unwrap();
        assert_eq!(entry.action, AuditAction::Create);
        assert_eq!(entry.entity, AuditEntity::RekamMedis);
        assert_eq!(entry.entity_id, Some(created.id));
        assert_eq!(entry.meta["personelId"], fx.patient.id.to_string());
        assert_eq!(entry.meta["jenisPemeriksaan"], "Umum");
        assert_eq!(created.visit_date, created.created_at);
    }

    #[test]
    fn create_for_unknown_patient_is_not_found() {
        let fx = fixture();
        let before = fx.core.audit().logs().unwrap().len();
        let err = fx
            .core
            .records()
            .create_encounter(
                NewEncounter::new(RecordId::new(), "Lanud Halim", EncounterType::Umum),
                fx.home_user.id,
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fx.core.audit().logs().unwrap().len(), before);
    }

    #[test]
    fn unknown_actor_writes_nothing() {
        let fx = fixture();
        let records = fx.core.records();
        let existing = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum),
                fx.home_user.id,
            )
            .unwrap();
        let before = fx.core.audit().logs().unwrap().len();
        let stranger = RecordId::new();

        let err = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum),
                stranger,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ErmError::NotFound {
                entity: EntityKind::User,
                ..
            }
        ));
        let exam = NewPeriodicExam {
            patient_id: fx.patient.id,
            unit: "Lanud Halim".into(),
            findings: ExamFindings::new(2024, ExamCategory::Periodik),
            doctor_id: None,
            status: None,
        };
        assert!(records.create_periodic_exam(exam, stranger).is_err());
        assert!(records
            .update_encounter(existing.id, EncounterPatch::default(), stranger)
            .is_err());
        assert!(records.delete_encounter(existing.id, stranger).is_err());

        assert_eq!(fx.core.audit().logs().unwrap().len(), before);
        assert_eq!(records.encounters_by_patient(fx.patient.id).unwrap().len(), 1);
        assert!(records.periodic_exams_by_patient(fx.patient.id).unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_missing_ids_are_not_found() {
        let fx = fixture();
        let missing = RecordId::new();
        let records = fx.core.records();

        assert!(matches!(
            records.update_encounter(missing, EncounterPatch::default(), fx.home_user.id),
            Err(ErmError::NotFound { .. })
        ));
        assert!(matches!(
            records.delete_encounter(missing, fx.home_user.id),
            Err(ErmError::NotFound { .. })
        ));
        assert!(matches!(
            records.update_periodic_exam(missing, ExamPatch::default(), fx.home_user.id),
            Err(ErmError::NotFound { .. })
        ));
        assert!(matches!(
            records.delete_periodic_exam(missing, fx.home_user.id),
            Err(ErmError::NotFound { .. })
        ));
    }

    #[test]
    fn update_keeps_authoring_unit_and_bumps_updated_at() {
        let fx = fixture();
        let records = fx.core.records();
        let created = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum),
                fx.home_user.id,
            )
            .unwrap();

        let updated = records
            .update_encounter(
                created.id,
                EncounterPatch {
                    diagnosis: Some("ISPA".into()),
                    ..Default::default()
                },
                fx.other_user.id,
            )
            .unwrap();

        assert_eq!(updated.unit, "Lanud Halim");
        assert_eq!(updated.diagnosis.unwrap(), "ISPA");
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn delete_leaves_only_the_audit_trace() {
        let fx = fixture();
        let records = fx.core.records();
        let created = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Rujukan),
                fx.home_user.id,
            )
            .unwrap();

        records.delete_encounter(created.id, fx.home_user.id).unwrap();

        assert!(records.encounters_by_patient(fx.patient.id).unwrap().is_empty());
        let trail = fx.core.audit().logs_for_entity(created.id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].action, AuditAction::Delete);
    }

    #[test]
    fn exam_patch_regenerates_resume() {
        let fx = fixture();
        let records = fx.core.records();
        let exam = records
            .create_periodic_exam(
                NewPeriodicExam {
                    patient_id: fx.patient.id,
                    unit: "Lanud Halim".into(),
                    findings: ExamFindings::new(2024, ExamCategory::Periodik),
                    doctor_id: None,
                    status: None,
                },
                fx.home_user.id,
            )
            .unwrap();
        assert_eq!(exam.resume, "RIKKES - Periodik Tahun 2024");

        let updated = records
            .update_periodic_exam(
                exam.id,
                ExamPatch {
                    conclusion: Some(Conclusion::Layak),
                    recommendation: Some("Lanjutkan dinas".into()),
                    ..Default::default()
                },
                fx.home_user.id,
            )
            .unwrap();

        let lines: Vec<&str> = updated.resume.lines().collect();
        assert_eq!(&lines[1..], &["Kesimpulan: Layak", "Rekomendasi: Lanjutkan dinas"]);

        // Same findings, same resume.
        let again = records
            .update_periodic_exam(exam.id, ExamPatch::default(), fx.home_user.id)
            .unwrap();
        assert_eq!(again.resume, updated.resume);
    }

    #[test]
    fn latest_exam_prefers_highest_year_then_latest_update() {
        let fx = fixture();
        let records = fx.core.records();
        let create = |year| {
            records
                .create_periodic_exam(
                    NewPeriodicExam {
                        patient_id: fx.patient.id,
                        unit: "Lanud Halim".into(),
                        findings: ExamFindings::new(year, ExamCategory::Periodik),
                        doctor_id: None,
                        status: None,
                    },
                    fx.home_user.id,
                )
                .unwrap()
        };

        create(2022);
        let first_2024 = create(2024);
        let second_2024 = create(2024);
        create(2023);

        let latest = records.latest_periodic_exam(fx.patient.id).unwrap().unwrap();
        assert_eq!(latest.id, second_2024.id);

        records
            .update_periodic_exam(first_2024.id, ExamPatch::default(), fx.home_user.id)
            .unwrap();
        let latest = records.latest_periodic_exam(fx.patient.id).unwrap().unwrap();
        assert_eq!(latest.id, first_2024.id);

        let years: Vec<i32> = records
            .periodic_exam_history(fx.patient.id)
            .unwrap()
            .iter()
            .map(|e| e.findings.year)
            .collect();
        assert_eq!(years, vec![2024, 2024, 2023, 2022]);
        assert!(records
            .periodic_exam_by_year(fx.patient.id, 2021)
            .unwrap()
            .is_none());
    }

    #[test]
    fn latest_encounter_filters_by_type() {
        let fx = fixture();
        let records = fx.core.records();
        let rikkes = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Rikkes),
                fx.home_user.id,
            )
            .unwrap();
        let general = records
            .create_encounter(
                NewEncounter::new(fx.patient.id, "Lanud Halim", EncounterType::Umum),
                fx.home_user.id,
            )
            .unwrap();

        let latest = records.latest_encounter(fx.patient.id, None).unwrap().unwrap();
        assert_eq!(latest.id, general.id);
        let latest = records
            .latest_encounter(fx.patient.id, Some(EncounterType::Rikkes))
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, rikkes.id);
    }
}
