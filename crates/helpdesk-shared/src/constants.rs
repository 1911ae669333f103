/// Auto-assignment skips staff with this many in-flight tickets or more
pub const AUTO_ASSIGN_CAP: u32 = 3;

/// A staff member cannot claim from the pool at this many in-flight tickets
pub const CLAIM_CAP: u32 = 5;

/// Tickets older than this (in hours) are eligible for escalation
pub const ESCALATION_AFTER_HOURS: i64 = 24;

/// Largest accepted escalation threshold: ten years of hours
pub const MAX_ESCALATION_AFTER_HOURS: u64 = 10 * 365 * 24;

/// Escalation sweep period in seconds
pub const ESCALATION_INTERVAL_SECS: u64 = 3600;

/// Wall-clock budget for one escalation sweep in seconds
pub const ESCALATION_BUDGET_SECS: u64 = 30;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Maximum ticket subject length in characters
pub const MAX_SUBJECT_LEN: usize = 200;

/// Maximum ticket description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 4_000;

/// Maximum staff note length in characters
pub const MAX_NOTE_LEN: usize = 4_000;

/// Default page size for audit reads
pub const DEFAULT_AUDIT_LIMIT: u32 = 100;

/// Upper bound on tickets examined by one escalation sweep
pub const ESCALATION_BATCH: u32 = 500;
