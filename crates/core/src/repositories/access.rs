//! Cross-facility access authorisation.
//!
//! A grant is the evidentiary record that a user outside a patient's home facility was
//! allowed to read that patient's data, and why. Granting is all-or-nothing: validation
//! happens first, then the grant and its audit entry are committed in one batch. A request
//! that fails validation leaves the store untouched.
//!
//! Grants are immutable. Facilities are snapshotted at request time, so a later transfer
//! of the patient (or reassignment of the user) does not rewrite history.

use super::audit::audit_meta;
use super::{AuditLog, CoreContext, PersonnelDirectory};
use crate::constants::ACCESS_GRANTS_COLLECTION;
use crate::models::{
    AccessGrant, AccessRequest, AccessStats, AuditAction, AuditEntity, AuditEntry,
    DataCategory, JustificationCode, Justified, Patient, User,
};
use crate::storage::{with_retry, Collection, StagedWrite};
use crate::ErmResult;
use erm_types::NonEmptyText;
use erm_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct AccessService {
    ctx: CoreContext,
    audit: AuditLog,
    directory: PersonnelDirectory,
    grants: Collection<AccessGrant>,
}

impl AccessService {
    pub(crate) fn new(ctx: CoreContext, audit: AuditLog, directory: PersonnelDirectory) -> Self {
        let grants = ctx.collection(ACCESS_GRANTS_COLLECTION);
        Self {
            ctx,
            audit,
            directory,
            grants,
        }
    }

    /// Validates, justifies and grants in one call.
    ///
    /// # Errors
    ///
    /// - [`crate::ErmError::EmptyDataCategories`] if `categories` is empty.
    /// - [`crate::ErmError::MissingJustificationNote`] for `Lainnya` without a note.
    /// - [`crate::ErmError::NotFound`] if the user or patient does not exist.
    ///
    /// Nothing is written when any of these occur.
    pub fn request_access(
        &self,
        user_id: RecordId,
        patient_id: RecordId,
        code: JustificationCode,
        note: Option<String>,
        categories: impl IntoIterator<Item = DataCategory>,
    ) -> ErmResult<AccessGrant> {
        let request = AccessRequest::new(user_id, patient_id, categories)?.justify(code, note)?;
        self.grant(request)
    }

    /// Turns a justified request into a persisted grant.
    pub fn grant(&self, request: AccessRequest<Justified>) -> ErmResult<AccessGrant> {
        let user = self.directory.user(request.user_id())?;
        let patient = self.directory.patient(request.patient_id())?;

        let (grant, entry) = self.prepare(request, &user, &patient)?;

        with_retry("grant_access", || {
            self.ctx.store.commit(&[
                self.stage(&grant)?,
                self.audit.stage_append(vec![entry.clone()])?,
            ])
        })?;

        tracing::info!(
            grant_id = %grant.id,
            user_id = %grant.user_id,
            patient_id = %grant.patient_id,
            code = %grant.code,
            origin = %grant.origin_facility,
            target = %grant.target_facility,
            "cross-facility access granted"
        );
        Ok(grant)
    }

    /// Builds a grant and its audit entry without writing either.
    pub(crate) fn prepare(
        &self,
        request: AccessRequest<Justified>,
        user: &User,
        patient: &Patient,
    ) -> ErmResult<(AccessGrant, AuditEntry)> {
        let origin = NonEmptyText::new(user.facility())?;
        let grant = request.into_grant(origin, patient.unit.clone(), self.ctx.clock.now());
        let categories: Vec<&str> = grant.categories.iter().map(|c| c.label()).collect();
        let entry = self.audit.entry(
            grant.user_id,
            AuditAction::Create,
            AuditEntity::AksesFasilitas,
            Some(grant.id),
            audit_meta! {
                "personelId" => grant.patient_id.to_string(),
                "fasilitasAsal" => grant.origin_facility.as_str(),
                "fasilitasTujuan" => grant.target_facility.as_str(),
                "alasanAkses" => grant.code.label(),
                "dataDiakses" => categories,
            },
        );
        Ok((grant, entry))
    }

    /// Stages `grant` appended to the grant collection.
    pub(crate) fn stage(&self, grant: &AccessGrant) -> ErmResult<StagedWrite> {
        let mut snapshot = self.grants.load()?;
        snapshot.items.push(grant.clone());
        self.grants.stage(&snapshot)
    }

    pub fn grants_by_patient(&self, patient_id: RecordId) -> ErmResult<Vec<AccessGrant>> {
        Ok(self
            .grants
            .all()?
            .into_iter()
            .filter(|g| g.patient_id == patient_id)
            .collect())
    }

    pub fn grants_by_user(&self, user_id: RecordId) -> ErmResult<Vec<AccessGrant>> {
        Ok(self
            .grants
            .all()?
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .collect())
    }

    /// Grants held by `user_id` for `patient_id`, newest first.
    pub fn grants_for(&self, user_id: RecordId, patient_id: RecordId) -> ErmResult<Vec<AccessGrant>> {
        let mut grants: Vec<_> = self
            .grants_by_patient(patient_id)?
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .collect();
        grants.sort_by(|a, b| b.accessed_at.cmp(&a.accessed_at));
        Ok(grants)
    }

    /// Newest-first grants for a patient. `None` uses the configured default limit.
    pub fn recent_grants(
        &self,
        patient_id: RecordId,
        limit: Option<usize>,
    ) -> ErmResult<Vec<AccessGrant>> {
        let limit = limit.unwrap_or_else(|| self.ctx.cfg.recent_grants_limit());
        let mut grants = self.grants_by_patient(patient_id)?;
        grants.sort_by(|a, b| b.accessed_at.cmp(&a.accessed_at));
        grants.truncate(limit);
        Ok(grants)
    }

    pub fn access_stats(&self, patient_id: RecordId) -> ErmResult<AccessStats> {
        let grants = self.grants_by_patient(patient_id)?;

        let mut stats = AccessStats {
            total: grants.len(),
            ..AccessStats::default()
        };
        for grant in &grants {
            *stats.by_code.entry(grant.code).or_default() += 1;
            *stats
                .by_target_facility
                .entry(grant.target_facility.to_string())
                .or_default() += 1;
        }
        stats.latest = grants.into_iter().max_by_key(|g| g.accessed_at);

        Ok(stats)
    }
}
