//! Storage layer abstraction trait definition

mod collaborators;
mod scan_run_repository;
mod subdomain_repository;
mod target_repository;

pub use collaborators::{NoopNotifier, ScanNotifier, Scanner};
pub use scan_run_repository::ScanRunRepository;
pub use subdomain_repository::SubdomainRepository;
pub use target_repository::TargetRepository;
