use std::fmt;
use std::time::Duration;

use rdsbroker_core::LastOperation;
use thiserror::Error;

/// Broker API call, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Catalog,
    Provision,
    Update,
    Deprovision,
    LastOperation,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operation::Catalog => "catalog",
            Operation::Provision => "provision",
            Operation::Update => "update",
            Operation::Deprovision => "deprovision",
            Operation::LastOperation => "last_operation",
        })
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{operation} request for {} failed: {source}", instance(.instance_id))]
    Transport {
        operation: Operation,
        instance_id: Option<String>,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} for {} returned status {status}: {body}", instance(.instance_id))]
    Protocol {
        operation: Operation,
        instance_id: Option<String>,
        status: u16,
        body: String,
    },

    #[error("{operation} for {} returned an undecodable body ({source}): {body}", instance(.instance_id))]
    Decode {
        operation: Operation,
        instance_id: Option<String>,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("invalid broker URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

impl ClientError {
    /// HTTP status observed, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Protocol { status, .. } => Some(*status),
            ClientError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(
        "operation on instance {instance_id} not finished after {timeout:?} (last state: {})",
        last_state(.last)
    )]
    Timeout {
        instance_id: String,
        timeout: Duration,
        last: Option<LastOperation>,
    },

    #[error("polling instance {instance_id} cancelled (last state: {})", last_state(.last))]
    Cancelled {
        instance_id: String,
        last: Option<LastOperation>,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl PollError {
    /// Last non-terminal result seen before giving up.
    pub fn last(&self) -> Option<&LastOperation> {
        match self {
            PollError::Timeout { last, .. } | PollError::Cancelled { last, .. } => last.as_ref(),
            PollError::Client(_) => None,
        }
    }
}

fn instance(instance_id: &Option<String>) -> &str {
    instance_id.as_deref().unwrap_or("broker")
}

fn last_state(last: &Option<LastOperation>) -> &'static str {
    last.as_ref().map_or("none observed", |op| op.state.as_str())
}
