//! Constants used throughout the E-RM core crate.
//!
//! Collection names, limits and fallback labels live here so the services, the CLI and the
//! REST layer agree on them.

/// Default directory for the file-backed store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "erm_data";

/// Default key namespace. Every collection key is `<namespace>:<collection>`.
pub const DEFAULT_NAMESPACE: &str = "binprofkes";

/// Collection holding clinical encounters.
pub const ENCOUNTERS_COLLECTION: &str = "rekam_medis";

/// Collection holding periodic fitness exams.
pub const PERIODIC_EXAMS_COLLECTION: &str = "rekam_rikkes";

/// Collection holding cross-facility access grants.
pub const ACCESS_GRANTS_COLLECTION: &str = "akses_fasilitas";

/// Collection holding continuity-of-care exports.
pub const CONTINUITY_EXPORTS_COLLECTION: &str = "continuity_of_care";

/// Collection holding audit entries.
pub const AUDIT_COLLECTION: &str = "audit";

/// Collection holding patients (personnel).
pub const PERSONNEL_COLLECTION: &str = "personel";

/// Collection holding application users.
pub const USERS_COLLECTION: &str = "users";

/// Origin facility recorded for users without an assigned unit.
pub const UNKNOWN_FACILITY: &str = "Fasilitas Tidak Diketahui";

/// Maximum diagnosis / procedure entries captured in a continuity export.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Number of visits itemised in a continuity summary.
pub const SUMMARY_VISIT_LIMIT: usize = 5;

/// Default page size for `recent_grants`.
pub const DEFAULT_RECENT_GRANTS_LIMIT: usize = 10;

/// Attempts made for a read-modify-write before a version conflict is returned.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// File extension used by the file-backed store.
pub const STORE_FILE_EXTENSION: &str = "json";
