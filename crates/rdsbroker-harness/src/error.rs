use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rdsbroker_backend::BackendError;
use rdsbroker_client::{ClientError, PollError};
use rdsbroker_core::{LastOperation, OperationState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("no free local port: {0}")]
    Port(#[source] std::io::Error),

    #[error("failed to start broker {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("broker did not print {marker:?} within {timeout:?}")]
    MarkerTimeout { marker: String, timeout: Duration },

    #[error("broker exited before printing {marker:?}")]
    BrokerExited { marker: String },

    #[error("failed to stop broker: {0}")]
    Stop(#[source] std::io::Error),

    #[error("catalog mismatch: {0}")]
    CatalogMismatch(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A stage of one instance lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Provision,
    AwaitProvision,
    Deprovision,
    AwaitDeprovision,
    VerifySnapshot,
    CleanupSnapshot,
    /// The lifecycle's task died before reporting a step.
    Task,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Step::Provision => "provision",
            Step::AwaitProvision => "waiting for provision",
            Step::Deprovision => "deprovision",
            Step::AwaitDeprovision => "waiting for deprovision",
            Step::VerifySnapshot => "final snapshot check",
            Step::CleanupSnapshot => "final snapshot cleanup",
            Step::Task => "lifecycle task",
        })
    }
}

/// One lifecycle step failed. Other lifecycles are unaffected.
#[derive(Debug, Error)]
#[error("{step} failed for instance {instance_id}: {failure}{}", cleanup_note(.cleanup.as_deref()))]
pub struct LifecycleError {
    pub step: Step,
    pub instance_id: String,
    #[source]
    pub failure: StepFailure,
    /// Set when the deprovision sent after a failed provision did not go
    /// through. The instance may still exist.
    pub cleanup: Option<String>,
}

fn cleanup_note(cleanup: Option<&str>) -> String {
    cleanup.map(|c| format!(" (cleanup: {c})")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("broker answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("expected {expected}, got {} ({})", .actual.state, .actual.description.as_deref().unwrap_or("no description"))]
    UnexpectedState {
        expected: OperationState,
        actual: LastOperation,
    },

    #[error("no final snapshot {0}")]
    MissingSnapshot(String),

    #[error("task aborted: {0}")]
    Aborted(String),
}

impl LifecycleError {
    pub fn new(step: Step, instance_id: &str, failure: impl Into<StepFailure>) -> Self {
        Self {
            step,
            instance_id: instance_id.to_string(),
            failure: failure.into(),
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cleanup: Option<String>) -> Self {
        self.cleanup = cleanup;
        self
    }
}
