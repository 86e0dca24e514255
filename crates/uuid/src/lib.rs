//! Record identifiers and timestamps for the E-RM store.
//!
//! Every persisted entity (encounters, periodic exams, access grants, continuity exports,
//! audit entries) is addressed by a stable string id. This crate fixes the shape of that id
//! and the clock used to stamp records.
//!
//! ## Canonical id form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the value produced by `Uuid::new_v4().simple().to_string()`. Ids supplied from
//! outside the core (HTTP path segments, CLI arguments) must already be canonical; use
//! [`RecordId::parse`] to validate them. Hyphenated or uppercase forms are rejected rather
//! than normalised so that one record never has two spellings in the audit log.
//!
//! ## Timestamps
//! [`MonotonicClock`] hands out strictly increasing UTC timestamps. Ordering queries
//! ("most recent grant", newest-first timelines) depend on two writes in the same
//! millisecond still comparing in insertion order.

mod clock;
mod id;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
