//! Type definitions

mod response;
mod scan;
mod subdomain;
mod target;

pub use response::{Ack, ApiResponse};
pub use scan::{
    CompletionReport, DispatchReceipt, ScanClosure, ScanOutcome, ScanRun, ScanRunStatus,
    ScanTrigger, TickOutcome, TickReport,
};
pub use subdomain::{
    CreateSubdomainRequest, DiscoveredSubdomain, NewSubdomain, Subdomain,
    UpdateSubdomainRequest, ALIVE_SUBDOMAIN_STATUS, DEFAULT_SUBDOMAIN_STATUS,
};
pub use target::{
    CreateTargetRequest, NewTarget, Page, ScanStatus, ScheduleState, ScheduleUpdate, Target,
    TargetDetails, UpdateTargetRequest,
};
