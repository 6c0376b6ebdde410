use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule between attempts of a retrying operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    None,
    Fixed(Duration),
    /// `step * attempt`, so the first attempt goes out immediately.
    Linear { step: Duration },
}

impl Backoff {
    /// Delay to wait before the zero-based `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => if attempt == 0 { Duration::ZERO } else { *delay },
            Backoff::Linear { step } => step.saturating_mul(attempt),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self { max_attempts, backoff }
    }

    pub const fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, backoff: Backoff::None }
    }

    pub const fn linear(max_attempts: u32, step: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Linear { step } }
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff.delay_before(attempt)
    }
}

/// Balance convergence wait after a funding transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizationPolicy {
    pub settle_delay: Duration,
    pub rounds: RetryPolicy,
}
