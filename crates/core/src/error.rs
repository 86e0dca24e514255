use crate::models::DataCategory;
use erm_uuid::RecordId;
use std::fmt;

/// Entities the core can report as missing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Patient,
    User,
    Encounter,
    PeriodicExam,
    AccessGrant,
    ContinuityExport,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::User => "user",
            Self::Encounter => "encounter",
            Self::PeriodicExam => "periodic exam",
            Self::AccessGrant => "access grant",
            Self::ContinuityExport => "continuity-of-care export",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three classes of failure a caller has to tell apart.
///
/// Every [`ErmError`] belongs to exactly one class. None of them is fatal to the process:
/// validation and not-found errors become form messages, persistence errors become a
/// toast asking the user to retry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum ErmError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("a justification note is required when the access reason is Lainnya")]
    MissingJustificationNote,
    #[error("at least one data category must be requested")]
    EmptyDataCategories,
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] erm_uuid::UuidError),
    #[error("required text field is empty: {0}")]
    EmptyText(#[from] erm_types::TextError),
    #[error("user {user_id} holds no access grant for patient {patient_id}")]
    NoAccessGrant {
        user_id: RecordId,
        patient_id: RecordId,
    },
    #[error("access grant {grant_id} does not cover {category}")]
    CategoryNotGranted {
        grant_id: RecordId,
        category: DataCategory,
    },

    #[error("an existing user must register new users")]
    ActorRequired,

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("version conflict on {key}: expected version {expected}, found {found}")]
    VersionConflict {
        key: String,
        expected: u64,
        found: u64,
    },
    #[error(
        "write failed and rollback also failed (key: {key}): write={write_error}; rollback={rollback_error}"
    )]
    RollbackFailed {
        key: String,
        #[source]
        write_error: Box<ErmError>,
        rollback_error: std::io::Error,
    },
}

impl ErmError {
    pub(crate) fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::MissingJustificationNote
            | Self::EmptyDataCategories
            | Self::InvalidIdentifier(_)
            | Self::EmptyText(_)
            | Self::ActorRequired
            | Self::NoAccessGrant { .. }
            | Self::CategoryNotGranted { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::FileRead(_)
            | Self::FileWrite(_)
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::VersionConflict { .. }
            | Self::RollbackFailed { .. } => ErrorKind::Persistence,
        }
    }

    /// True for the two errors that mean "this user may not see this data".
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::NoAccessGrant { .. } | Self::CategoryNotGranted { .. }
        )
    }
}

pub type ErmResult<T> = std::result::Result<T, ErmError>;
