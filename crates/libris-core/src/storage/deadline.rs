use std::time::{Duration, Instant};

use crate::errors::LibrisError;

/// Default per-operation budget
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(3);

/// Time budget for one storage operation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start the clock now
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// The error reported when `op` runs out of time
    pub fn timeout(&self, op: &str) -> LibrisError {
        LibrisError::Timeout {
            op: op.to_string(),
            after_ms: u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Fail with `Timeout` if the budget is spent
    ///
    /// # Errors
    /// Returns `LibrisError::Timeout` naming `op`.
    pub fn check(&self, op: &str) -> Result<(), LibrisError> {
        if self.expired() {
            Err(self.timeout(op))
        } else {
            Ok(())
        }
    }
}
