//! In-process store used by tests and embedders.

use super::{check_versions, KeyValueStore, StagedWrite, StoreKey, VersionedValue};
use crate::ErmResult;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, VersionedValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> ErmResult<Option<VersionedValue>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn commit(&self, writes: &[StagedWrite]) -> ErmResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        check_versions(writes, |key| {
            Ok(entries.get(key).map(|v| v.version).unwrap_or(0))
        })?;

        for write in writes {
            match &write.value {
                Some(value) => {
                    entries.insert(
                        write.key.clone(),
                        VersionedValue {
                            version: write.expected_version + 1,
                            value: value.clone(),
                        },
                    );
                }
                None => {
                    entries.remove(&write.key);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErmError;
    use serde_json::json;

    #[test]
    fn set_bumps_version_and_rejects_stale_writes() {
        let store = MemoryStore::new();
        let key = StoreKey::new("binprofkes", "rekam_medis");

        assert_eq!(store.set(&key, json!([1]), 0).unwrap(), 1);
        assert_eq!(store.set(&key, json!([1, 2]), 1).unwrap(), 2);

        let err = store.set(&key, json!([9]), 1).unwrap_err();
        match err {
            ErmError::VersionConflict {
                expected, found, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }

        let stored = store.get(&key).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.value, json!([1, 2]));
    }

    #[test]
    fn conflicting_batch_writes_nothing() {
        let store = MemoryStore::new();
        let records = StoreKey::new("binprofkes", "rekam_medis");
        let audit = StoreKey::new("binprofkes", "audit");
        store.set(&audit, json!(["existing"]), 0).unwrap();

        let result = store.commit(&[
            StagedWrite::put(records.clone(), 0, json!(["record"])),
            StagedWrite::put(audit.clone(), 0, json!(["stale"])),
        ]);

        assert!(matches!(result, Err(ErmError::VersionConflict { .. })));
        assert!(store.get(&records).unwrap().is_none());
        assert_eq!(store.get(&audit).unwrap().unwrap().value, json!(["existing"]));
    }

    #[test]
    fn remove_clears_key() {
        let store = MemoryStore::new();
        let key = StoreKey::new("binprofkes", "users");
        store.set(&key, json!([]), 0).unwrap();
        store.remove(&key, 1).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }
}
