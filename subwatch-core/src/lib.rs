//! Subwatch Core Library
//!
//! Core logic of the subdomain monitoring backend:
//! - Target and subdomain management
//! - Scan dispatch and recurring schedules (`ScanCoordinator`)
//! - Client-side reconciliation (`reconcile`)
//!
//! Storage, scanning and alert delivery are abstracted through traits and
//! provided by the platform layer.

pub mod error;
pub mod reconcile;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::{ScanCoordinator, ServiceContext, SubdomainService, TargetService};
pub use traits::{
    NoopNotifier, ScanNotifier, ScanRunRepository, Scanner, SubdomainRepository,
    TargetRepository,
};
