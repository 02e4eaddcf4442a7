//! rdsbroker-core
//!
//! Pure protocol types for the service broker API: the advertised catalog,
//! provision/update payloads, last-operation states and the final snapshot
//! naming convention. No HTTP or AWS dependency.

pub mod catalog;
pub mod error;
pub mod operation;
pub mod provision;
pub mod snapshot;

pub use crate::catalog::{Catalog, Plan, Service};
pub use crate::error::CatalogError;
pub use crate::operation::{LastOperation, LastOperationQuery, OperationState};
pub use crate::provision::{OperationResponse, ProvisionRequest, UpdateRequest};
pub use crate::snapshot::{SnapshotRecord, final_snapshot_id};
