use chrono::{DateTime, Utc};
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

labelled_enum! {
    pub enum AuditAction {
        Login => "login",
        Create => "create",
        Update => "update",
        Delete => "delete",
    }
}

labelled_enum! {
    pub enum AuditEntity {
        Personel => "Personel",
        Pelatihan => "Pelatihan",
        Fasilitas => "Fasilitas",
        User => "User",
        Notifikasi => "Notifikasi",
        RekamMedis => "RekamMedis",
        RekamRikkes => "RekamRikkes",
        AksesFasilitas => "AksesFasilitas",
        ContinuityOfCare => "ContinuityOfCare",
    }
}

/// One append-only audit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: RecordId,
    pub user_id: RecordId,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: Option<RecordId>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}
