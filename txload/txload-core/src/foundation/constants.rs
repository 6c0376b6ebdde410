//! Ledger and load-run constants.

/// Address version tag joining base and key identifier (`{base}lal{key_identifier}`).
pub const ADDRESS_VERSION: &str = "lal";

/// Version tag placed on every unsigned transaction.
pub const TRANSACTION_VERSION: &str = "la0l";

/// Value of each output created during preparation and spent during dispatch.
pub const UNIT_AMOUNT: u64 = 1;

/// Output position of the change output in a preparation round.
pub const CHANGE_OUTPUT_POSITION: u32 = 0;

/// Page size passed to the node when listing unspent outputs.
pub const UNSPENT_QUERY_LIMIT: u64 = 10_000_000;

/// Wait after the funding transaction before the first balance poll (seconds).
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 15;

/// Balance poll rounds before funding is declared failed.
pub const DEFAULT_STABILIZE_ATTEMPTS: u32 = 12;

/// Linear backoff step between balance poll rounds (seconds).
pub const DEFAULT_STABILIZE_BACKOFF_STEP_SECS: u64 = 2;

/// Sender-side wait for its own balance to settle before spending.
pub const DEFAULT_SENDER_ATTEMPTS: u32 = 10;

/// Linear backoff step for the sender-side wait (seconds).
pub const DEFAULT_SENDER_BACKOFF_STEP_SECS: u64 = 1;

/// Cooldown between the last preparation round and dispatch (seconds).
pub const DEFAULT_PREPARE_COOLDOWN_SECS: u64 = 60;

/// Signing attempts per dispatched transaction.
pub const DEFAULT_SIGN_ATTEMPTS: u32 = 5;

/// Per-worker progress log interval (successful submissions).
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;
