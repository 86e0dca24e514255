use crate::constants::UNKNOWN_FACILITY;
use chrono::{DateTime, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};

labelled_enum! {
    pub enum Rank {
        Tamtama => "Tamtama",
        Bintara => "Bintara",
        Perwira => "Perwira",
    }
}

labelled_enum! {
    /// Application role. Gating by role happens in the UI; the core records it only.
    pub enum Role {
        SuperAdmin => "SuperAdmin",
        AdminSatuan => "AdminSatuan",
        Operator => "Operator",
        Viewer => "Viewer",
        Puskesau => "Puskesau",
    }
}

/// A service member whose medical records the core manages.
///
/// Identity (`id`, `nrp`) survives transfers; only `unit` changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    /// Service number, unique across the whole corps.
    pub nrp: NonEmptyText,
    pub name: NonEmptyText,
    pub rank: Rank,
    pub corps: Option<String>,
    /// Current home unit.
    pub unit: NonEmptyText,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPatient {
    pub nrp: String,
    pub name: String,
    pub rank: Rank,
    #[serde(default)]
    pub corps: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub role: Role,
    /// Assigned unit. Central staff (e.g. Puskesau) may have none.
    pub unit: Option<NonEmptyText>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The facility this user acts from.
    pub fn facility(&self) -> &str {
        self.unit
            .as_ref()
            .map(NonEmptyText::as_str)
            .unwrap_or(UNKNOWN_FACILITY)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub unit: Option<String>,
}
