use std::fmt;

use serde::{Deserialize, Serialize};

/// State of an instance's asynchronous operation.
///
/// `Gone` is never read from the wire. The client synthesizes it when the
/// broker reports that the instance no longer exists; it serializes as
/// `"gone"` so reports can carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "gone", skip_deserializing)]
    Gone,
}

impl OperationState {
    /// No further transition happens once a terminal state is observed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationState::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::InProgress => "in progress",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
            OperationState::Gone => "gone",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET /v2/service_instances/{id}/last_operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    pub state: OperationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LastOperation {
    pub fn gone() -> Self {
        Self {
            state: OperationState::Gone,
            description: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Identifies the operation to poll. Empty optional ids are left off the
/// query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastOperationQuery {
    pub instance_id: String,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub operation: Option<String>,
}

impl LastOperationQuery {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    pub fn service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    /// Thread the opaque token returned by provision/deprovision.
    pub fn operation(mut self, operation: Option<String>) -> Self {
        self.operation = operation;
        self
    }
}
