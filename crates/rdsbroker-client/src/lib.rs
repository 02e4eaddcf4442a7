//! rdsbroker-client
//!
//! HTTP client for the service broker API plus the poller that drives an
//! asynchronous operation to a terminal state.
//!
//! Public API:
//! - `BrokerClient` — catalog, provision, update, deprovision, last operation
//! - `OperationPoller::await_terminal()` — poll last operation until terminal,
//!   timeout or cancellation
//!
//! Neither type retries. Callers that want resilience layer it on top.

pub mod ack;
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod poller;

pub use crate::ack::OperationAck;
pub use crate::client::BrokerClient;
pub use crate::config::{BrokerClientConfig, Credentials};
pub use crate::error::{ClientError, Operation, PollError};
pub use crate::poller::{OperationPoller, PollSettings};

pub use tokio_util::sync::CancellationToken;
