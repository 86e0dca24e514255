//! Store-backed services.
//!
//! Each service owns one or more collections and writes its audit entries in the same
//! [`KeyValueStore::commit`] batch as the records they describe. Services hold only `Arc`s and
//! are cheap to clone.
//!
//! ## Pure Data Operations
//!
//! This module contains **only** data operations. Authentication, HTTP handling and role
//! gating belong in `erm-api-rest` and `erm-cli`.

pub mod access;
pub mod audit;
pub mod personnel;
pub mod records;

pub use access::AccessService;
pub use audit::AuditLog;
pub use personnel::PersonnelDirectory;
pub use records::RecordStore;

use crate::config::CoreConfig;
use crate::storage::{Collection, KeyValueStore};
use erm_uuid::Clock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Dependencies every service shares.
#[derive(Clone, Debug)]
pub(crate) struct CoreContext {
    pub(crate) cfg: Arc<CoreConfig>,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl CoreContext {
    pub(crate) fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Collection::new(Arc::clone(&self.store), self.cfg.store_key(name))
    }
}
