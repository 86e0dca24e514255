//! Cross-facility access grants and the request state machine that produces them.
//!
//! A request moves `Requested -> Justified -> Granted`. The first two states are the
//! type-state markers [`Requested`] and [`Justified`]; the terminal state is an
//! [`AccessGrant`], which only [`crate::AccessService::grant`] can create. A request that
//! has not been justified therefore cannot be turned into a grant at all.

use crate::{ErmError, ErmResult};
use chrono::{DateTime, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

labelled_enum! {
    /// Reason given for reading a record held at another facility.
    pub enum JustificationCode {
        Rikkes => "Rikkes",
        Dikbangum => "Dikbangum",
        Rujukan => "Rujukan",
        Lanjutan => "Lanjutan",
        /// Requires a free-text note.
        Lainnya => "Lainnya",
    }
}

labelled_enum! {
    /// Category of patient data a grant can cover.
    pub enum DataCategory {
        Timeline => "timeline",
        SupportingResults => "hasil_penunjang",
        MedicalResume => "resume_medis",
    }
}

/// An immutable record that a user was permitted to read a patient's data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: RecordId,
    pub user_id: RecordId,
    pub patient_id: RecordId,
    /// The requesting user's unit at request time.
    pub origin_facility: NonEmptyText,
    /// The patient's home unit at request time.
    pub target_facility: NonEmptyText,
    pub code: JustificationCode,
    pub note: Option<NonEmptyText>,
    pub accessed_at: DateTime<Utc>,
    pub categories: BTreeSet<DataCategory>,
    pub created_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn covers(&self, category: DataCategory) -> bool {
        self.categories.contains(&category)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessStats {
    pub total: usize,
    pub by_code: BTreeMap<JustificationCode, usize>,
    pub by_target_facility: BTreeMap<String, usize>,
    pub latest: Option<AccessGrant>,
}

// ============================================================================
// REQUEST STATE MACHINE
// ============================================================================

/// Marker for a request that names who wants what, with no justification yet.
#[derive(Clone, Debug)]
pub struct Requested;

/// Marker for a request carrying a validated justification.
#[derive(Clone, Debug)]
pub struct Justified {
    code: JustificationCode,
    note: Option<NonEmptyText>,
}

/// A pending access request.
///
/// Generic parameter `S` is either [`Requested`] or [`Justified`].
#[derive(Clone, Debug)]
pub struct AccessRequest<S> {
    user_id: RecordId,
    patient_id: RecordId,
    categories: BTreeSet<DataCategory>,
    state: S,
}

impl AccessRequest<Requested> {
    /// Starts a request.
    ///
    /// # Errors
    ///
    /// Returns [`ErmError::EmptyDataCategories`] if `categories` is empty.
    pub fn new(
        user_id: RecordId,
        patient_id: RecordId,
        categories: impl IntoIterator<Item = DataCategory>,
    ) -> ErmResult<Self> {
        let categories: BTreeSet<_> = categories.into_iter().collect();
        if categories.is_empty() {
            return Err(ErmError::EmptyDataCategories);
        }

        Ok(Self {
            user_id,
            patient_id,
            categories,
            state: Requested,
        })
    }

    /// Attaches a justification.
    ///
    /// **This method consumes `self`.** A blank note is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ErmError::MissingJustificationNote`] if `code` is
    /// [`JustificationCode::Lainnya`] and no non-blank note is given.
    pub fn justify(
        self,
        code: JustificationCode,
        note: Option<String>,
    ) -> ErmResult<AccessRequest<Justified>> {
        let note = NonEmptyText::from_optional(note);
        if code == JustificationCode::Lainnya && note.is_none() {
            return Err(ErmError::MissingJustificationNote);
        }

        Ok(AccessRequest {
            user_id: self.user_id,
            patient_id: self.patient_id,
            categories: self.categories,
            state: Justified { code, note },
        })
    }
}

impl<S> AccessRequest<S> {
    pub fn user_id(&self) -> RecordId {
        self.user_id
    }

    pub fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    pub fn categories(&self) -> &BTreeSet<DataCategory> {
        &self.categories
    }
}

impl AccessRequest<Justified> {
    pub fn code(&self) -> JustificationCode {
        self.state.code
    }

    pub fn note(&self) -> Option<&NonEmptyText> {
        self.state.note.as_ref()
    }

    pub(crate) fn into_grant(
        self,
        origin_facility: NonEmptyText,
        target_facility: NonEmptyText,
        now: DateTime<Utc>,
    ) -> AccessGrant {
        AccessGrant {
            id: RecordId::new(),
            user_id: self.user_id,
            patient_id: self.patient_id,
            origin_facility,
            target_facility,
            code: self.state.code,
            note: self.state.note,
            accessed_at: now,
            categories: self.categories,
            created_at: now,
        }
    }
}
