//! Log file names, line patterns and the crate whitelist.

pub const LOG_FILE_NAME: &str = "txload.log";
/// Warn and error lines only.
pub const ERR_LOG_FILE_NAME: &str = "txload_err.log";

/// `timestamp [LEVEL] message [module] [thread-id]`
pub const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5})}] {m} [{M}] [{I}]{n}";
pub const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:5}] {m} [{M}] [{I}]{n}";

/// Rotate at 20 MB.
pub const LOG_FILE_MAX_SIZE: u64 = 20_000_000;
pub const LOG_FILE_MAX_ROLLS: u32 = 3;

/// Crates logged at the app level; everything else is off unless named explicitly.
pub const WHITELISTED_CRATES: &[&str] = &["txload_core", "txload_service"];
