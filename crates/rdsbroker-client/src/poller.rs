use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rdsbroker_core::{LastOperation, LastOperationQuery};

use crate::client::BrokerClient;
use crate::error::PollError;

/// Cap for deadlines that would overflow `Instant`. Thirty years never fires.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollSettings {
    /// RDS instances take minutes to create; poll gently for up to an hour.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// Drives one instance's asynchronous operation to a terminal state.
#[derive(Debug, Clone)]
pub struct OperationPoller {
    client: BrokerClient,
    settings: PollSettings,
}

impl OperationPoller {
    pub fn new(client: BrokerClient, settings: PollSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Poll last_operation until the state is terminal.
    ///
    /// The first poll is immediate, so an operation that already finished
    /// costs one round trip. Client errors abort at once. The deadline
    /// bounds in-flight requests as well as the sleeps between them.
    pub async fn await_terminal(
        &self,
        query: &LastOperationQuery,
        cancel: &CancellationToken,
    ) -> Result<LastOperation, PollError> {
        let instance_id = query.instance_id.as_str();
        let deadline = instant_after(Instant::now(), self.settings.timeout);
        let mut last: Option<LastOperation> = None;

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(instance_id, last)),
                res = timeout_at(deadline, self.client.query_last_operation(query)) => res,
            };
            let Ok(result) = polled else {
                return Err(self.timed_out(instance_id, last));
            };
            let op = result?;

            if last.as_ref().map(|l| l.state) != Some(op.state) {
                debug!(
                    instance_id,
                    state = %op.state,
                    description = op.description.as_deref().unwrap_or_default(),
                    "operation state changed"
                );
            }

            if op.is_terminal() {
                info!(instance_id, state = %op.state, "operation finished");
                return Ok(op);
            }
            last = Some(op);

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(instance_id, last));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(instance_id, last)),
                _ = sleep_until(instant_after(now, self.settings.interval).min(deadline)) => {}
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out(instance_id, last));
            }
        }
    }

    fn timed_out(&self, instance_id: &str, last: Option<LastOperation>) -> PollError {
        PollError::Timeout {
            instance_id: instance_id.to_string(),
            timeout: self.settings.timeout,
            last,
        }
    }

    fn cancelled(&self, instance_id: &str, last: Option<LastOperation>) -> PollError {
        PollError::Cancelled {
            instance_id: instance_id.to_string(),
            last,
        }
    }
}

fn instant_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}
