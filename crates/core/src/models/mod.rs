//! Persisted record types.
//!
//! Field names are English; enumeration values keep the Indonesian labels used on the wire
//! and in rendered documents (`"Dinas Luar"`, `"Perlu Observasi"`, ...).

/// Declares a closed enumeration whose serialized form and display label are the same
/// fixed string.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::ErmError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s.trim())
                    .ok_or_else(|| {
                        crate::ErmError::InvalidInput(format!(
                            "unknown {} '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }
    };
}

mod access;
mod audit;
mod continuity;
mod encounter;
mod periodic_exam;
mod personnel;

pub use access::{
    AccessGrant, AccessRequest, AccessStats, DataCategory, Justified, JustificationCode,
    Requested,
};
pub use audit::{AuditAction, AuditEntity, AuditEntry};
pub use continuity::{
    ContinuityExport, DiagnosisEntry, LatestExamResult, MedicationEntry, ProcedureEntry,
    TransferRequest,
};
pub use encounter::{
    Encounter, EncounterPatch, EncounterStatus, EncounterType, NewEncounter, SupportingResult,
};
pub use periodic_exam::{
    Conclusion, ExamCategory, ExamFindings, ExamPatch, ExamStatus, ExamSupportingResults,
    HealthRating, HealthRatings, NewPeriodicExam, OtherResult, PeriodicExam,
};
pub use personnel::{NewPatient, NewUser, Patient, Rank, Role, User};
