//! rdsbroker-backend
//!
//! Reconciliation against the infrastructure behind the broker: a health
//! probe and final-snapshot lookup/cleanup. Independent of the broker API.

pub mod config;
pub mod error;
pub mod rds;

use std::future::Future;
use std::pin::Pin;

use rdsbroker_core::SnapshotRecord;

pub use crate::config::build_sdk_config;
pub use crate::error::BackendError;
pub use crate::rds::RdsBackend;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read/cleanup access to the backing store of one region.
///
/// Methods return boxed futures for dyn compatibility, so harness code can
/// hold an `Arc<dyn ResourceBackend>` and swap in a fake.
pub trait ResourceBackend: Send + Sync {
    /// Cheap read-only call proving the provider is reachable with the
    /// configured credentials.
    fn ping(&self) -> BoxFuture<'_, Result<(), BackendError>>;

    /// Look up `{instance_id}-final-snapshot`. Absence is not an error.
    fn get_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<SnapshotRecord, BackendError>>;

    /// Delete `{instance_id}-final-snapshot`. Returns `false` when there was
    /// nothing to delete.
    fn delete_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, BackendError>>;
}
