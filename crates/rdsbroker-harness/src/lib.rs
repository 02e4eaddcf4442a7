//! rdsbroker-harness
//!
//! Drives a running broker end to end: start the broker binary, check its
//! catalog, push instances through provision → poll → deprovision → poll,
//! and confirm the final snapshot on the RDS side.
//!
//! Everything a run needs lives in a [`HarnessContext`] built for that run
//! and passed by reference, so lifecycles can run side by side.

pub mod catalog_check;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod process;

pub use crate::catalog_check::verify_catalog;
pub use crate::config::{BrokerFileConfig, HarnessConfig};
pub use crate::error::{HarnessError, LifecycleError, Step, StepFailure};
pub use crate::lifecycle::{
    HarnessContext, LifecycleReport, LifecycleSpec, run_lifecycle, run_lifecycles,
};
pub use crate::process::{BrokerProcess, CREDENTIALS_CHECK_MARKER, started_marker};
