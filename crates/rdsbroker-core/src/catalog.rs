use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// The document served at `GET /v2/catalog`.
///
/// Built once by the broker from static configuration and read-only from
/// then on. The order of `services` on the wire is unspecified; use
/// [`Catalog::sorted_by_id`] before comparing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default)]
    pub plan_updateable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Catalog {
    /// Copy of the catalog with services ordered by id.
    pub fn sorted_by_id(&self) -> Catalog {
        let mut services = self.services.clone();
        services.sort_by(|a, b| a.id.cmp(&b.id));
        Catalog { services }
    }

    /// Check that service ids are unique and plan ids are unique within
    /// their service. Reports the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.id.as_str()) {
                return Err(CatalogError::DuplicateService(service.id.clone()));
            }
            let mut plans = HashSet::new();
            for plan in &service.plans {
                if !plans.insert(plan.id.as_str()) {
                    return Err(CatalogError::DuplicatePlan {
                        service_id: service.id.clone(),
                        plan_id: plan.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn service(&self, service_id: &str) -> Result<&Service, CatalogError> {
        self.services
            .iter()
            .find(|s| s.id == service_id)
            .ok_or_else(|| CatalogError::ServiceNotFound(service_id.to_string()))
    }

    pub fn plan(&self, service_id: &str, plan_id: &str) -> Result<&Plan, CatalogError> {
        self.service(service_id)?
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| CatalogError::PlanNotFound {
                service_id: service_id.to_string(),
                plan_id: plan_id.to_string(),
            })
    }
}
