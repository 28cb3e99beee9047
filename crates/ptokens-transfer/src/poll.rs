//! Poll scheduler shared by every monitoring loop

use std::future::Future;
use std::time::Duration;

use ptokens_core::{MonitorConfig, TransferError};

/// Answer of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Ready(T),
    Pending,
}

/// Interval and failure budget of one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub max_consecutive_failures: u32,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: Duration::from_secs(60),
            max_consecutive_failures: 30,
        }
    }

    /// Schedule with the configured backoff ceiling and failure budget
    pub fn with_config(interval: Duration, config: &MonitorConfig) -> Self {
        Self {
            interval,
            max_backoff: config.max_backoff(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }

    /// Wait after `failures` consecutive transient errors (doubling, capped)
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(16);
        self.interval
            .saturating_mul(factor)
            .min(self.max_backoff.max(self.interval))
    }
}

/// Run `probe` until it yields `Ready`.
///
/// `Pending` sleeps one interval. Transient errors back off exponentially and
/// are surfaced once `max_consecutive_failures` of them happen in a row; any
/// other error ends the loop immediately.
pub async fn poll_until<T, F, Fut>(
    source: &str,
    schedule: &PollSchedule,
    mut probe: F,
) -> Result<T, TransferError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>, TransferError>>,
{
    let mut failures: u32 = 0;

    loop {
        let wait = match probe().await {
            Ok(Poll::Ready(value)) => return Ok(value),
            Ok(Poll::Pending) => {
                failures = 0;
                schedule.interval
            }
            Err(e) if e.is_transient() => {
                failures += 1;
                if failures >= schedule.max_consecutive_failures {
                    tracing::error!(
                        source = %source,
                        failures,
                        error = %e,
                        "Giving up after consecutive fetch failures"
                    );
                    return Err(e);
                }
                let wait = schedule.backoff(failures);
                tracing::warn!(
                    source = %source,
                    failures,
                    retry_in_ms = wait.as_millis() as u64,
                    error = %e,
                    "Transient fetch error"
                );
                wait
            }
            Err(e) => return Err(e),
        };

        tokio::time::sleep(wait).await;
    }
}
