use chrono::{DateTime, Utc};
use std::time::Duration;

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Transactions per second over `elapsed`; zero when no time has passed.
pub fn throughput(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    count as f64 / secs
}
