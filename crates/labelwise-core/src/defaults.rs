//! Centralized default constants for labelwise.
//!
//! Every crate reads shared defaults from here instead of defining its own
//! magic numbers.

// =============================================================================
// BACKEND
// =============================================================================

/// Default backend origin.
pub const API_URL: &str = "http://localhost:8000";

/// Path prefix of the versioned REST API.
pub const API_PREFIX: &str = "/api/v1";

/// Request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// QUERY CACHE
// =============================================================================

/// Age after which a cached query is refetched on next access.
pub const STALE_TIME_SECS: u64 = 60;

/// Maximum retries for a failed read query (401 is never retried).
pub const MAX_READ_RETRIES: u32 = 3;

/// First retry delay; doubles per attempt.
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound on a single retry delay.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

// =============================================================================
// POLLING
// =============================================================================

/// Project status (ingestion progress) refresh interval.
pub const PROJECT_STATUS_POLL_SECS: u64 = 5;

/// Line items table refresh interval.
pub const LINE_ITEMS_POLL_SECS: u64 = 10;

/// Dashboard refresh interval.
pub const DASHBOARD_POLL_SECS: u64 = 30;

// =============================================================================
// PAGINATION
// =============================================================================

/// Line items per page in the samples table.
pub const LINE_ITEMS_PAGE_LIMIT: u32 = 10;

/// Users per page in the admin table.
pub const USERS_PAGE_LIMIT: u32 = 8;

/// "Fetch everyone" limit used when picking users for task assignment.
pub const USERS_FETCH_ALL_LIMIT: u32 = 10_000_000;

/// Audit log entries per page.
pub const AUDIT_PAGE_LIMIT: u32 = 10;

// =============================================================================
// VALIDATION
// =============================================================================

/// Minimum password length accepted by the backend.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Maximum password length accepted by the backend.
pub const PASSWORD_MAX_LEN: usize = 40;

/// Maximum length of project name, description, and URL.
pub const PROJECT_FIELD_MAX_LEN: usize = 255;

/// Maximum length of an export file name (before the `.jsonl` suffix).
pub const EXPORT_FILENAME_MAX_LEN: usize = 100;
