//! Structured logging field name constants for labelwise.
//!
//! All crates use these constants for structured `tracing` fields so log
//! output can be filtered by the same keys everywhere.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Session ended unexpectedly, unrecoverable client state |
//! | WARN  | Request failed and will be retried, or failed for good |
//! | INFO  | Login/logout, mutations completed |
//! | DEBUG | Requests sent, cache hits/misses, navigation decisions |
//! | TRACE | Per-message snapshot building, poll ticks |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID sent as `X-Request-Id`.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "client", "cache", "session", "poll", "review", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "list_line_items", "submit_snapshot", "invalidate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Project being operated on.
pub const PROJECT_ID: &str = "project_id";

/// Line item database id.
pub const LINE_ITEM_ID: &str = "line_item_id";

/// 1-based sample ordinal within a project.
pub const LINE_INDEX: &str = "line_index";

/// Target or current line item status.
pub const STATUS: &str = "status";

/// User affected by an admin operation.
pub const USER_ID: &str = "user_id";

/// Query cache key.
pub const CACHE_KEY: &str = "cache_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Retry attempt number (0 = first try).
pub const ATTEMPT: &str = "attempt";

/// Number of items returned by a list call.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// HTTP status code of a response.
pub const HTTP_STATUS: &str = "http_status";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
