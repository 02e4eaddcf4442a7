use rdsbroker_core::OperationResponse;

use crate::error::{ClientError, Operation};

/// Statuses that mean the broker accepted a provision/update/deprovision.
pub const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];

/// What came back from provision, update or deprovision.
///
/// A non-success status is not an error at this level: the ack carries the
/// status and raw body, and the operation fields stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationAck {
    pub status: u16,
    pub dashboard_url: Option<String>,
    /// Opaque token to pass unchanged to last_operation.
    pub operation: Option<String>,
    /// Raw body, kept only for non-success statuses.
    pub body: Option<String>,
}

impl OperationAck {
    pub(crate) fn accepted(status: u16, response: OperationResponse) -> Self {
        Self {
            status,
            dashboard_url: response.dashboard_url.filter(|s| !s.is_empty()),
            operation: response.operation.filter(|s| !s.is_empty()),
            body: None,
        }
    }

    pub(crate) fn rejected(status: u16, body: String) -> Self {
        Self {
            status,
            dashboard_url: None,
            operation: None,
            body: Some(body),
        }
    }

    pub fn is_success(&self) -> bool {
        ACCEPTED_STATUSES.contains(&self.status)
    }

    /// The broker is still working: 202, or any ack carrying a token.
    pub fn is_async(&self) -> bool {
        self.status == 202 || self.operation.is_some()
    }

    /// Turn a non-success ack into a protocol error for callers that don't
    /// want to inspect the status themselves.
    pub fn into_success(
        self,
        operation: Operation,
        instance_id: &str,
    ) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Protocol {
                operation,
                instance_id: Some(instance_id.to_string()),
                status: self.status,
                body: self.body.unwrap_or_default(),
            })
        }
    }
}
