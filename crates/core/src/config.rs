//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the core services.
//! Nothing in the core reads environment variables during request handling; binaries collect
//! the raw values and hand them to [`CoreConfig::from_env_values`].

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_NAMESPACE, DEFAULT_RECENT_GRANTS_LIMIT, MAX_HISTORY_ENTRIES,
    SUMMARY_VISIT_LIMIT,
};
use crate::storage::StoreKey;
use crate::{ErmError, ErmResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    namespace: String,
    recent_grants_limit: usize,
    history_limit: usize,
    summary_visit_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
            recent_grants_limit: DEFAULT_RECENT_GRANTS_LIMIT,
            history_limit: MAX_HISTORY_ENTRIES,
            summary_visit_limit: SUMMARY_VISIT_LIMIT,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default limits.
    pub fn new(data_dir: PathBuf, namespace: String) -> ErmResult<Self> {
        let namespace = namespace.trim().to_string();
        if namespace.is_empty() {
            return Err(ErmError::InvalidInput("namespace cannot be empty".into()));
        }
        if namespace.contains(':') {
            return Err(ErmError::InvalidInput(
                "namespace cannot contain ':'".into(),
            ));
        }

        Ok(Self {
            data_dir,
            namespace,
            ..Self::default()
        })
    }

    /// Build a config from optional raw values (as read from `ERM_DATA_DIR` and
    /// `ERM_NAMESPACE`). Blank values fall back to the defaults.
    pub fn from_env_values(
        data_dir: Option<String>,
        namespace: Option<String>,
    ) -> ErmResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let data_dir = non_blank(data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let namespace = non_blank(namespace).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Self::new(data_dir, namespace)
    }

    pub fn with_recent_grants_limit(mut self, limit: usize) -> Self {
        self.recent_grants_limit = limit;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_summary_visit_limit(mut self, limit: usize) -> Self {
        self.summary_visit_limit = limit;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn recent_grants_limit(&self) -> usize {
        self.recent_grants_limit
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn summary_visit_limit(&self) -> usize {
        self.summary_visit_limit
    }

    /// Key for `collection` inside this config's namespace.
    pub fn store_key(&self, collection: &str) -> StoreKey {
        StoreKey::new(&self.namespace, collection)
    }
}
