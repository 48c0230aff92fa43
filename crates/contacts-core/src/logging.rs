//! Structured logging field names shared by every crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Storage failures and internal defects |
//! | WARN  | Recoverable issue, request rejected for a server-side reason |
//! | INFO  | Lifecycle events (startup, shutdown), contacts created or removed |
//! | DEBUG | Reads, searches, intermediate values |
//! | TRACE | Per-row data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "database"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "contacts", "memory_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "search", "clear_all"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owning user of the contact(s) being operated on.
pub const USER_ID: &str = "user_id";

/// Contact identifier being operated on.
pub const CONTACT_ID: &str = "contact_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of rows removed by a delete.
pub const REMOVED_COUNT: &str = "removed_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Machine-readable error code.
pub const ERROR_CODE: &str = "error_code";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
