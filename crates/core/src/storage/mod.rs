//! Versioned key-value storage.
//!
//! Every collection (encounters, periodic exams, grants, exports, audit entries, personnel,
//! users) is stored as one JSON array under a namespaced key. Each stored value carries a
//! version number; writes name the version they were computed from and are rejected with
//! [`ErmError::VersionConflict`] if another writer got there first.
//!
//! Several writes can be applied as one unit with [`KeyValueStore::commit`]. All version
//! checks run before anything is written, and a failure part-way through restores the
//! earlier writes of the batch, so a record and its audit entry become visible together or
//! not at all.

mod collection;
mod file;
mod memory;

pub use collection::{Collection, Snapshot};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::constants::MAX_WRITE_ATTEMPTS;
use crate::{ErmError, ErmResult};
use serde_json::Value;
use std::fmt;

/// Namespaced key, rendered as `<namespace>:<collection>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    namespace: String,
    collection: String,
}

impl StoreKey {
    pub fn new(namespace: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            collection: collection.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.collection)
    }
}

/// A stored value and the version it was written at.
///
/// Absent keys behave as version `0`; the first write therefore expects `0` and produces `1`.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedValue {
    pub version: u64,
    pub value: Value,
}

/// One write inside a [`KeyValueStore::commit`] batch.
#[derive(Clone, Debug)]
pub struct StagedWrite {
    pub key: StoreKey,
    pub expected_version: u64,
    /// `None` removes the key.
    pub value: Option<Value>,
}

impl StagedWrite {
    pub fn put(key: StoreKey, expected_version: u64, value: Value) -> Self {
        Self {
            key,
            expected_version,
            value: Some(value),
        }
    }

    pub fn remove(key: StoreKey, expected_version: u64) -> Self {
        Self {
            key,
            expected_version,
            value: None,
        }
    }
}

/// Storage backend injected into the core.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Returns the current value for `key`, or `None` if it has never been written.
    fn get(&self, key: &StoreKey) -> ErmResult<Option<VersionedValue>>;

    /// Applies every write in `writes` or none of them.
    ///
    /// # Errors
    ///
    /// - [`ErmError::VersionConflict`] if any write's `expected_version` is stale. Nothing is
    ///   written in that case.
    /// - [`ErmError::FileWrite`] (or similar) if the backend fails mid-batch. Earlier writes
    ///   have been rolled back.
    /// - [`ErmError::RollbackFailed`] if the rollback itself failed.
    fn commit(&self, writes: &[StagedWrite]) -> ErmResult<()>;

    /// Compare-and-swap write of a single key. Returns the new version.
    fn set(&self, key: &StoreKey, value: Value, expected_version: u64) -> ErmResult<u64> {
        self.commit(&[StagedWrite::put(key.clone(), expected_version, value)])?;
        Ok(expected_version + 1)
    }

    /// Compare-and-swap removal of a single key.
    fn remove(&self, key: &StoreKey, expected_version: u64) -> ErmResult<()> {
        self.commit(&[StagedWrite::remove(key.clone(), expected_version)])
    }
}

/// Checks that no key appears twice in a batch and that every expected version matches.
///
/// `current` returns the stored version for a key (`0` when absent).
pub(crate) fn check_versions(
    writes: &[StagedWrite],
    mut current: impl FnMut(&StoreKey) -> ErmResult<u64>,
) -> ErmResult<()> {
    for (index, write) in writes.iter().enumerate() {
        if writes[..index].iter().any(|w| w.key == write.key) {
            return Err(ErmError::InvalidInput(format!(
                "batch writes {} more than once",
                write.key
            )));
        }

        let found = current(&write.key)?;
        if found != write.expected_version {
            return Err(ErmError::VersionConflict {
                key: write.key.to_string(),
                expected: write.expected_version,
                found,
            });
        }
    }
    Ok(())
}

/// Runs a read-modify-write closure, retrying on version conflicts.
///
/// The closure must reload everything it reads on each call. After
/// [`MAX_WRITE_ATTEMPTS`] conflicting attempts the last conflict is returned.
pub(crate) fn with_retry<T>(
    operation: &str,
    mut attempt: impl FnMut() -> ErmResult<T>,
) -> ErmResult<T> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt() {
            Err(err @ ErmError::VersionConflict { .. }) if attempts < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(operation, attempts, error = %err, "retrying after version conflict");
            }
            result => return result,
        }
    }
}
