//! Patients (personnel) and application users.
//!
//! The core consults this directory for two facts it must snapshot at request time: a
//! patient's current home unit and a requesting user's assigned unit. It also backs the
//! referential checks made before any record is written.

use super::audit::audit_meta;
use super::{AuditLog, CoreContext};
use crate::constants::{PERSONNEL_COLLECTION, USERS_COLLECTION};
use crate::error::EntityKind;
use crate::models::{AuditAction, AuditEntity, NewPatient, NewUser, Patient, User};
use crate::storage::{with_retry, Collection};
use crate::{ErmError, ErmResult};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct PersonnelDirectory {
    ctx: CoreContext,
    audit: AuditLog,
    patients: Collection<Patient>,
    users: Collection<User>,
}

impl PersonnelDirectory {
    pub(crate) fn new(ctx: CoreContext, audit: AuditLog) -> Self {
        let patients = ctx.collection(PERSONNEL_COLLECTION);
        let users = ctx.collection(USERS_COLLECTION);
        Self {
            ctx,
            audit,
            patients,
            users,
        }
    }

    // ------------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------------

    /// Registers a patient.
    ///
    /// # Errors
    ///
    /// - [`ErmError::EmptyText`] if the service number, name or unit is blank.
    /// - [`ErmError::InvalidInput`] if the service number is already registered.
    /// - [`ErmError::NotFound`] if the acting user does not exist.
    pub fn create_patient(&self, new: NewPatient, actor: RecordId) -> ErmResult<Patient> {
        let now = self.ctx.clock.now();
        let patient = Patient {
            id: RecordId::new(),
            nrp: NonEmptyText::new(&new.nrp)?,
            name: NonEmptyText::new(&new.name)?,
            rank: new.rank,
            corps: NonEmptyText::from_optional(new.corps).map(NonEmptyText::into_inner),
            unit: NonEmptyText::new(&new.unit)?,
            position: NonEmptyText::from_optional(new.position).map(NonEmptyText::into_inner),
            created_at: now,
            updated_at: now,
        };
        self.user(actor)?;
        let entry = self.audit.entry(
            actor,
            AuditAction::Create,
            AuditEntity::Personel,
            Some(patient.id),
            audit_meta! { "nrp" => patient.nrp.as_str(), "satuan" => patient.unit.as_str() },
        );

        with_retry("create_patient", || {
            let mut snapshot = self.patients.load()?;
            if snapshot.items.iter().any(|p| p.nrp == patient.nrp) {
                return Err(ErmError::InvalidInput(format!(
                    "NRP {} is already registered",
                    patient.nrp
                )));
            }
            snapshot.items.push(patient.clone());

            self.ctx.store.commit(&[
                self.patients.stage(&snapshot)?,
                self.audit.stage_append(vec![entry.clone()])?,
            ])
        })?;

        tracing::info!(patient_id = %patient.id, unit = %patient.unit, "patient registered");
        Ok(patient)
    }

    pub fn patient(&self, id: RecordId) -> ErmResult<Patient> {
        self.find_patient(id)?
            .ok_or_else(|| ErmError::not_found(EntityKind::Patient, id))
    }

    pub fn find_patient(&self, id: RecordId) -> ErmResult<Option<Patient>> {
        Ok(self.patients.all()?.into_iter().find(|p| p.id == id))
    }

    pub fn patients(&self) -> ErmResult<Vec<Patient>> {
        self.patients.all()
    }

    /// Moves a patient to a new home unit.
    ///
    /// Records, grants and exports keep the facilities they were written with; only the
    /// patient's current unit changes.
    pub fn transfer_patient(
        &self,
        id: RecordId,
        new_unit: &str,
        actor: RecordId,
    ) -> ErmResult<Patient> {
        let new_unit = NonEmptyText::new(new_unit)?;
        self.user(actor)?;

        let updated = with_retry("transfer_patient", || {
            let mut snapshot = self.patients.load()?;
            let patient = snapshot
                .items
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ErmError::not_found(EntityKind::Patient, id))?;

            let previous_unit = std::mem::replace(&mut patient.unit, new_unit.clone());
            patient.updated_at = self.ctx.clock.now();
            let updated = patient.clone();

            let entry = self.audit.entry(
                actor,
                AuditAction::Update,
                AuditEntity::Personel,
                Some(id),
                audit_meta! {
                    "satuanLama" => previous_unit.as_str(),
                    "satuanBaru" => new_unit.as_str(),
                },
            );
            self.ctx.store.commit(&[
                self.patients.stage(&snapshot)?,
                self.audit.stage_append(vec![entry])?,
            ])?;
            Ok(updated)
        })?;

        tracing::info!(patient_id = %id, unit = %updated.unit, "patient transferred");
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    /// Registers a user. With no `actor` the entry is attributed to the new user itself,
    /// which is how the first administrator is bootstrapped.
    ///
    /// # Errors
    ///
    /// - [`ErmError::ActorRequired`] if `actor` is `None` and users already exist.
    /// - [`ErmError::NotFound`] if the acting user does not exist.
    pub fn create_user(&self, new: NewUser, actor: Option<RecordId>) -> ErmResult<User> {
        let user = User {
            id: RecordId::new(),
            name: NonEmptyText::new(&new.name)?,
            role: new.role,
            unit: NonEmptyText::from_optional(new.unit),
            created_at: self.ctx.clock.now(),
        };
        let entry = self.audit.entry(
            actor.unwrap_or(user.id),
            AuditAction::Create,
            AuditEntity::User,
            Some(user.id),
            audit_meta! { "role" => user.role.label(), "satuan" => user.facility() },
        );

        with_retry("create_user", || {
            let mut snapshot = self.users.load()?;
            match actor {
                None if !snapshot.items.is_empty() => return Err(ErmError::ActorRequired),
                Some(actor) if !snapshot.items.iter().any(|u| u.id == actor) => {
                    return Err(ErmError::not_found(EntityKind::User, actor));
                }
                _ => {}
            }
            snapshot.items.push(user.clone());
            self.ctx.store.commit(&[
                self.users.stage(&snapshot)?,
                self.audit.stage_append(vec![entry.clone()])?,
            ])
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub fn user(&self, id: RecordId) -> ErmResult<User> {
        self.users
            .all()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| ErmError::not_found(EntityKind::User, id))
    }

    pub fn users(&self) -> ErmResult<Vec<User>> {
        self.users.all()
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{NewPatient, NewUser, Rank, Role};
    use crate::test_support::fixture;
    use crate::{ErmCore, ErmError};
    use erm_uuid::RecordId;

    fn new_patient(nrp: &str) -> NewPatient {
        NewPatient {
            nrp: nrp.into(),
            name: "Serka Budi".into(),
            rank: Rank::Bintara,
            corps: Some("Kes".into()),
            unit: "Lanud Halim".into(),
            position: None,
        }
    }

    #[test]
    fn duplicate_nrp_is_rejected() {
        let fx = fixture();
        let before = fx.core.audit().logs().unwrap().len();

        let err = fx
            .core
            .directory()
            .create_patient(new_patient(fx.patient.nrp.as_str()), fx.home_user.id)
            .unwrap_err();
        assert!(matches!(err, ErmError::InvalidInput(_)));
        assert_eq!(fx.core.directory().patients().unwrap().len(), 1);
        assert_eq!(fx.core.audit().logs().unwrap().len(), before);
    }

    #[test]
    fn unknown_actor_cannot_register_or_move_patients() {
        let fx = fixture();
        let before = fx.core.audit().logs().unwrap().len();
        let directory = fx.core.directory();

        let err = directory
            .create_patient(new_patient("521002"), RecordId::new())
            .unwrap_err();
        assert!(matches!(err, ErmError::NotFound { .. }));
        assert!(directory
            .transfer_patient(fx.patient.id, "Lanud Iswahjudi", RecordId::new())
            .is_err());

        assert_eq!(directory.patient(fx.patient.id).unwrap().unit, "Lanud Halim");
        assert_eq!(directory.patients().unwrap().len(), 1);
        assert_eq!(fx.core.audit().logs().unwrap().len(), before);
    }

    #[test]
    fn blank_unit_is_rejected_before_writing() {
        let core = ErmCore::in_memory();
        let mut new = new_patient("521002");
        new.unit = "  ".into();

        let err = core
            .directory()
            .create_patient(new, RecordId::new())
            .unwrap_err();
        assert!(matches!(err, ErmError::EmptyText(_)));
        assert!(core.audit().logs().unwrap().is_empty());
    }

    #[test]
    fn transfer_changes_unit_and_is_audited() {
        let fx = fixture();
        let moved = fx
            .core
            .directory()
            .transfer_patient(fx.patient.id, "Lanud Iswahjudi", fx.home_user.id)
            .unwrap();

        assert_eq!(moved.unit, "Lanud Iswahjudi");
        assert_eq!(moved.nrp, fx.patient.nrp);
        let last = fx.core.audit().logs().unwrap().pop().unwrap();
        assert_eq!(last.meta["satuanLama"], "Lanud Halim");
        assert_eq!(last.meta["satuanBaru"], "Lanud Iswahjudi");
    }

    #[test]
    fn later_users_need_an_existing_actor() {
        let fx = fixture();
        let before = fx.core.audit().logs().unwrap().len();
        let directory = fx.core.directory();
        let new_user = || NewUser {
            name: "Sertu Wati".into(),
            role: Role::Viewer,
            unit: Some("Lanud Halim".into()),
        };

        let err = directory.create_user(new_user(), None).unwrap_err();
        assert!(matches!(err, ErmError::ActorRequired));
        let err = directory
            .create_user(new_user(), Some(RecordId::new()))
            .unwrap_err();
        assert!(matches!(err, ErmError::NotFound { .. }));
        assert_eq!(directory.users().unwrap().len(), 3);
        assert_eq!(fx.core.audit().logs().unwrap().len(), before);

        let created = directory
            .create_user(new_user(), Some(fx.home_user.id))
            .unwrap();
        let last = fx.core.audit().logs().unwrap().pop().unwrap();
        assert_eq!(last.user_id, fx.home_user.id);
        assert_eq!(last.entity_id, Some(created.id));
    }

    #[test]
    fn first_user_audits_itself() {
        let core = ErmCore::in_memory();
        let user = core
            .directory()
            .create_user(
                NewUser {
                    name: "Admin".into(),
                    role: Role::SuperAdmin,
                    unit: None,
                },
                None,
            )
            .unwrap();

        let logs = core.audit().logs().unwrap();
        assert_eq!(logs[0].user_id, user.id);
        assert_eq!(logs[0].meta["satuan"], "Fasilitas Tidak Diketahui");
    }
}
