//! # E-RM Core
//!
//! Cross-facility medical-record access control and audit for the BINPROFKES electronic
//! medical record.
//!
//! This crate contains pure data operations over an injected key-value store:
//! - Audit log: append-only record of every security-relevant action
//! - Record store: encounters and periodic exams, keyed by patient
//! - Access authorisation: justified, audited grants for cross-facility reads
//! - Timeline aggregation across every authoring facility
//! - Continuity-of-care exports for patient transfers
//! - Medical resume generation for periodic exams
//!
//! **No API concerns**: HTTP handling, CLI parsing and role gating belong in `erm-api-rest`
//! and `erm-cli`.
//!
//! Everything is wired explicitly through [`ErmCore`]; there are no global singletons.

pub mod config;
pub mod constants;
pub mod continuity;
pub mod disclosure;
pub mod error;
pub mod models;
pub mod repositories;
pub mod resume;
pub mod storage;
pub mod timeline;

pub use config::CoreConfig;
pub use continuity::ContinuityExporter;
pub use disclosure::{Disclosure, DisclosureBasis, DisclosureGate};
pub use error::{EntityKind, ErmError, ErmResult, ErrorKind};
pub use repositories::{AccessService, AuditLog, PersonnelDirectory, RecordStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use timeline::{SupportingResultEntry, TimelineAggregator, TimelineEvent, VisitStats};

pub use erm_types::NonEmptyText;
pub use erm_uuid::{Clock, ManualClock, MonotonicClock, RecordId};

use repositories::CoreContext;
use std::sync::Arc;

/// Every core service, built once over one store.
#[derive(Clone, Debug)]
pub struct ErmCore {
    cfg: Arc<CoreConfig>,
    audit: AuditLog,
    directory: PersonnelDirectory,
    records: RecordStore,
    timeline: TimelineAggregator,
    access: AccessService,
    exporter: ContinuityExporter,
    disclosure: DisclosureGate,
}

impl ErmCore {
    pub fn new(store: Arc<dyn KeyValueStore>, cfg: Arc<CoreConfig>) -> Self {
        Self::with_clock(store, cfg, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        cfg: Arc<CoreConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ctx = CoreContext {
            cfg: Arc::clone(&cfg),
            store,
            clock,
        };

        let audit = AuditLog::new(ctx.clone());
        let directory = PersonnelDirectory::new(ctx.clone(), audit.clone());
        let records = RecordStore::new(ctx.clone(), audit.clone(), directory.clone());
        let timeline = TimelineAggregator::new(records.clone());
        let access = AccessService::new(ctx.clone(), audit.clone(), directory.clone());
        let exporter = ContinuityExporter::new(
            ctx,
            audit.clone(),
            directory.clone(),
            records.clone(),
            timeline.clone(),
            access.clone(),
        );
        let disclosure = DisclosureGate::new(
            directory.clone(),
            access.clone(),
            records.clone(),
            timeline.clone(),
            exporter.clone(),
        );

        Self {
            cfg,
            audit,
            directory,
            records,
            timeline,
            access,
            exporter,
            disclosure,
        }
    }

    /// Opens a [`FileStore`] under the configured data directory.
    pub fn open_file_store(cfg: Arc<CoreConfig>) -> ErmResult<Self> {
        let store = FileStore::open(cfg.data_dir())?;
        tracing::info!(data_dir = %cfg.data_dir().display(), namespace = cfg.namespace(), "file store opened");
        Ok(Self::new(Arc::new(store), cfg))
    }

    /// A core over a fresh [`MemoryStore`] with default configuration.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(CoreConfig::default()))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn directory(&self) -> &PersonnelDirectory {
        &self.directory
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn timeline(&self) -> &TimelineAggregator {
        &self.timeline
    }

    pub fn access(&self) -> &AccessService {
        &self.access
    }

    pub fn exporter(&self) -> &ContinuityExporter {
        &self.exporter
    }

    pub fn disclosure(&self) -> &DisclosureGate {
        &self.disclosure
    }
}
