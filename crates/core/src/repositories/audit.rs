//! Append-only audit log.
//!
//! Every security-relevant action lands here: logins, record creation and modification,
//! and cross-facility access. Entries are never edited or removed. Other services do not
//! write to the log directly; they build entries with [`AuditLog::entry`] and hand them to
//! [`AuditLog::stage_append`] so the entries commit together with the records they describe.

use super::CoreContext;
use crate::constants::AUDIT_COLLECTION;
use crate::models::{AuditAction, AuditEntity, AuditEntry};
use crate::storage::{with_retry, Collection, StagedWrite};
use crate::ErmResult;
use erm_uuid::RecordId;
use serde_json::{Map, Value};

#[derive(Clone, Debug)]
pub struct AuditLog {
    ctx: CoreContext,
    entries: Collection<AuditEntry>,
}

impl AuditLog {
    pub(crate) fn new(ctx: CoreContext) -> Self {
        let entries = ctx.collection(AUDIT_COLLECTION);
        Self { ctx, entries }
    }

    /// All entries in insertion order.
    pub fn logs(&self) -> ErmResult<Vec<AuditEntry>> {
        self.entries.all()
    }

    pub fn logs_by_user(&self, user_id: RecordId) -> ErmResult<Vec<AuditEntry>> {
        Ok(self
            .logs()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }

    pub fn logs_for_entity(&self, entity_id: RecordId) -> ErmResult<Vec<AuditEntry>> {
        Ok(self
            .logs()?
            .into_iter()
            .filter(|e| e.entity_id == Some(entity_id))
            .collect())
    }

    /// Records a login. Logins have no companion record, so the entry is committed alone.
    pub fn record_login(&self, user_id: RecordId) -> ErmResult<AuditEntry> {
        let entry = self.entry(
            user_id,
            AuditAction::Login,
            AuditEntity::User,
            Some(user_id),
            Map::new(),
        );

        with_retry("record_login", || {
            let write = self.stage_append(vec![entry.clone()])?;
            self.ctx.store.commit(&[write])
        })?;

        tracing::info!(user_id = %user_id, "login recorded");
        Ok(entry)
    }

    /// Builds an entry stamped with the current time. Nothing is written.
    pub(crate) fn entry(
        &self,
        user_id: RecordId,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<RecordId>,
        meta: Map<String, Value>,
    ) -> AuditEntry {
        AuditEntry {
            id: RecordId::new(),
            user_id,
            action,
            entity,
            entity_id,
            timestamp: self.ctx.clock.now(),
            meta,
        }
    }

    /// Loads the log and stages it with `new_entries` appended.
    ///
    /// Call inside a retry loop: the staged write is conditional on the version read here.
    pub(crate) fn stage_append(&self, new_entries: Vec<AuditEntry>) -> ErmResult<StagedWrite> {
        let mut snapshot = self.entries.load()?;
        snapshot.items.extend(new_entries);
        self.entries.stage(&snapshot)
    }
}

/// Builds an audit `meta` object from `key => value` pairs.
macro_rules! audit_meta {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut meta = serde_json::Map::new();
        $( meta.insert($key.to_string(), serde_json::json!($value)); )*
        meta
    }};
}

pub(crate) use audit_meta;

#[cfg(test)]
mod tests {
    use super::audit_meta;
    use crate::ErmCore;
    use erm_uuid::RecordId;

    #[test]
    fn login_is_appended_in_order() {
        let core = ErmCore::in_memory();
        let first = RecordId::new();
        let second = RecordId::new();

        core.audit().record_login(first).unwrap();
        core.audit().record_login(second).unwrap();

        let logs = core.audit().logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].user_id, first);
        assert_eq!(logs[1].user_id, second);
        assert!(logs[0].timestamp < logs[1].timestamp);
        assert_eq!(core.audit().logs_by_user(second).unwrap().len(), 1);
    }

    #[test]
    fn meta_macro_builds_object() {
        let meta = audit_meta! { "personelId" => "abc", "tahun" => 2024 };
        assert_eq!(meta["personelId"], "abc");
        assert_eq!(meta["tahun"], 2024);
    }
}
