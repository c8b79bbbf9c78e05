use std::time::Duration;

use crate::dispatch::CycleError;

/// What to do after a failed cycle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Fixed-delay retry of whole cycles on transport failure.
///
/// `max_retries` counts retries after the first attempt, so one cycle makes
/// at most `max_retries + 1` submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// `retries_so_far` is the number of retries already made for this cycle.
    pub fn decide(&self, retries_so_far: u32, err: &CycleError) -> RetryDecision {
        match err {
            CycleError::Transport(_) if retries_so_far < self.max_retries => {
                RetryDecision::RetryAfter(self.backoff)
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CyclePhase;
    use crate::processor::TransportError;
    use anyhow::anyhow;
    use reqwest::StatusCode;

    fn transport() -> CycleError {
        CycleError::Transport(TransportError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        })
    }

    #[test]
    fn retries_transport_errors_up_to_the_limit() {
        let policy = RetryPolicy::default();
        for n in 0..3 {
            assert_eq!(
                policy.decide(n, &transport()),
                RetryDecision::RetryAfter(Duration::from_secs(60))
            );
        }
        assert_eq!(policy.decide(3, &transport()), RetryDecision::GiveUp);
        assert_eq!(policy.decide(7, &transport()), RetryDecision::GiveUp);
    }

    #[test]
    fn never_retries_fatal_errors() {
        let policy = RetryPolicy::default();
        let fatal = CycleError::Fatal {
            phase: CyclePhase::Selecting,
            source: anyhow!("database is locked"),
        };
        assert_eq!(policy.decide(0, &fatal), RetryDecision::GiveUp);
    }

    #[test]
    fn no_retry_gives_up_immediately() {
        assert_eq!(
            RetryPolicy::no_retry().decide(0, &transport()),
            RetryDecision::GiveUp
        );
    }
}
