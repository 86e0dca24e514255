//! File-backed store.
//!
//! Layout: `<root>/<namespace>/<collection>.json`, each file holding an envelope
//! `{"version": n, "value": ...}`. Writes go to `<collection>.json.tmp` and are renamed into
//! place. Writers inside one process are serialised by a mutex; writers in other processes
//! are caught by the version check.

use super::{check_versions, KeyValueStore, StagedWrite, StoreKey, VersionedValue};
use crate::constants::STORE_FILE_EXTENSION;
use crate::{ErmError, ErmResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u64,
    value: Value,
}

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> ErmResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(ErmError::FileWrite)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root
            .join(key.namespace())
            .join(format!("{}.{}", key.collection(), STORE_FILE_EXTENSION))
    }

    fn read_bytes(path: &Path) -> ErmResult<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ErmError::FileRead(e)),
        }
    }

    fn read_envelope(path: &Path) -> ErmResult<Option<Envelope>> {
        Self::read_bytes(path)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(ErmError::Deserialization))
            .transpose()
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> ErmResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ErmError::FileWrite)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, bytes).map_err(ErmError::FileWrite)?;
        std::fs::rename(&tmp, path).map_err(ErmError::FileWrite)
    }

    fn apply(path: &Path, write: &StagedWrite) -> ErmResult<()> {
        match &write.value {
            Some(value) => {
                let envelope = Envelope {
                    version: write.expected_version + 1,
                    value: value.clone(),
                };
                let bytes =
                    serde_json::to_vec_pretty(&envelope).map_err(ErmError::Serialization)?;
                Self::write_atomically(path, &bytes)
            }
            None => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ErmError::FileWrite(e)),
            },
        }
    }

    fn restore(path: &Path, previous: &Option<Vec<u8>>) -> std::io::Result<()> {
        match previous {
            Some(bytes) => std::fs::write(path, bytes),
            None => match std::fs::remove_file(path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &StoreKey) -> ErmResult<Option<VersionedValue>> {
        let envelope = Self::read_envelope(&self.path_for(key))?;
        tracing::debug!(key = %key, found = envelope.is_some(), "store read");
        Ok(envelope.map(|e| VersionedValue {
            version: e.version,
            value: e.value,
        }))
    }

    fn commit(&self, writes: &[StagedWrite]) -> ErmResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut previous: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(writes.len());
        check_versions(writes, |key| {
            let path = self.path_for(key);
            let bytes = Self::read_bytes(&path)?;
            let version = match &bytes {
                Some(raw) => {
                    serde_json::from_slice::<Envelope>(raw)
                        .map_err(ErmError::Deserialization)?
                        .version
                }
                None => 0,
            };
            previous.push((path, bytes));
            Ok(version)
        })?;

        let mut applied = 0;
        let result: ErmResult<()> = (|| {
            for (write, (path, _)) in writes.iter().zip(&previous) {
                Self::apply(path, write)?;
                applied += 1;
            }
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(write_error) => {
                tracing::warn!(error = %write_error, applied, "batch write failed, rolling back");
                // Undo in reverse order. The failed write is included since it may have
                // removed or replaced its file before erroring.
                let touched = (applied + 1).min(writes.len());
                for ((path, old), write) in previous[..touched]
                    .iter()
                    .zip(&writes[..touched])
                    .rev()
                {
                    if let Err(rollback_error) = Self::restore(path, old) {
                        return Err(ErmError::RollbackFailed {
                            key: write.key.to_string(),
                            write_error: Box::new(write_error),
                            rollback_error,
                        });
                    }
                }
                Err(write_error)
            }
        }
    }
}
