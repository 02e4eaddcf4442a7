use serde::{Deserialize, Serialize};

pub const DEFAULT_ORGANIZATION_GUID: &str = "test-organization-id";
pub const DEFAULT_SPACE_GUID: &str = "space-id";

/// Body of `PUT /v2/service_instances/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    pub organization_guid: String,
    pub space_guid: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ProvisionRequest {
    pub fn new(service_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            plan_id: plan_id.into(),
            organization_guid: DEFAULT_ORGANIZATION_GUID.to_string(),
            space_guid: DEFAULT_SPACE_GUID.to_string(),
            parameters: serde_json::Map::new(),
        }
    }

    pub fn organization(mut self, guid: impl Into<String>) -> Self {
        self.organization_guid = guid.into();
        self
    }

    pub fn space(mut self, guid: impl Into<String>) -> Self {
        self.space_guid = guid.into();
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Body of `PATCH /v2/service_instances/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_values: Option<PreviousValues>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousValues {
    pub plan_id: String,
}

impl UpdateRequest {
    pub fn new(service_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            plan_id: plan_id.into(),
            parameters: serde_json::Map::new(),
            previous_values: None,
        }
    }

    pub fn previous_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.previous_values = Some(PreviousValues {
            plan_id: plan_id.into(),
        });
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Body returned by provision, update and deprovision. Both fields are
/// optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}
