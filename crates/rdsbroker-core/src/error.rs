use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate service id: {0}")]
    DuplicateService(String),

    #[error("duplicate plan id {plan_id} in service {service_id}")]
    DuplicatePlan { service_id: String, plan_id: String },

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("plan not found: {service_id}/{plan_id}")]
    PlanNotFound { service_id: String, plan_id: String },
}
