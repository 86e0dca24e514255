//! Typed view over one stored collection.

use super::{KeyValueStore, StagedWrite, StoreKey};
use crate::{ErmError, ErmResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Items of a collection as read at a particular version.
#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub version: u64,
}

/// A collection of `T` stored as a JSON array under one key.
#[derive(Debug)]
pub struct Collection<T> {
    store: Arc<dyn KeyValueStore>,
    key: StoreKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: StoreKey) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Reads the collection. A key that was never written loads as empty at version 0.
    pub fn load(&self) -> ErmResult<Snapshot<T>> {
        match self.store.get(&self.key)? {
            Some(stored) => Ok(Snapshot {
                items: serde_json::from_value(stored.value)
                    .map_err(ErmError::Deserialization)?,
                version: stored.version,
            }),
            None => Ok(Snapshot {
                items: Vec::new(),
                version: 0,
            }),
        }
    }

    /// Convenience for read-only callers.
    pub fn all(&self) -> ErmResult<Vec<T>> {
        self.load().map(|s| s.items)
    }

    /// Stages a write of `snapshot.items`, conditional on the version it was loaded at.
    pub fn stage(&self, snapshot: &Snapshot<T>) -> ErmResult<StagedWrite> {
        let value = serde_json::to_value(&snapshot.items).map_err(ErmError::Serialization)?;
        Ok(StagedWrite::put(self.key.clone(), snapshot.version, value))
    }
}
