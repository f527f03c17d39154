//! Target related type definitions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Subdomain;

/// Scan status of a target
///
/// `Queued` and `Running` both mean a scan is outstanding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No scan outstanding
    #[default]
    Idle,
    /// Dispatched, waiting for a worker
    Queued,
    /// Claimed by a worker
    Running,
}

impl ScanStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
        }
    }

    /// Whether a scan is outstanding in this status.
    #[must_use]
    pub fn is_outstanding(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            other => Err(format!("unknown scan status '{other}'")),
        }
    }
}

/// A monitored root entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    /// Store-assigned ID
    pub id: i64,
    /// Unique display name
    pub name: String,
    /// Root URL (http/https)
    pub url: Option<String>,
    /// Scan status
    pub scan_status: ScanStatus,
    /// Whether a recurring cadence is active
    pub is_scheduled: bool,
    /// Recurring interval in minutes (kept when the schedule is disabled)
    pub waiting_minutes: u32,
    /// Next tick, only set while scheduled
    pub next_run_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    /// The schedule fields as a standalone record.
    #[must_use]
    pub fn schedule(&self) -> ScheduleState {
        ScheduleState {
            target_id: self.id,
            is_scheduled: self.is_scheduled,
            waiting_minutes: self.waiting_minutes,
            next_run_time: self.next_run_time,
        }
    }

    /// Whether the schedule is armed and its tick has been reached.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_scheduled && self.next_run_time.is_some_and(|t| t <= now)
    }
}

/// Create target request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTargetRequest {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Update target request (absent fields are left untouched)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTargetRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Validated data for a new target row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTarget {
    pub name: String,
    pub url: Option<String>,
}

/// Target with its subdomains (newest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDetails {
    pub target: Target,
    pub subdomains: Vec<Subdomain>,
}

/// Authoritative schedule fields, as confirmed by the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleState {
    pub target_id: i64,
    pub is_scheduled: bool,
    pub waiting_minutes: u32,
    pub next_run_time: Option<DateTime<Utc>>,
}

/// Schedule change written by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub is_scheduled: bool,
    pub waiting_minutes: u32,
    pub next_run_time: Option<DateTime<Utc>>,
}

impl ScheduleUpdate {
    /// Armed schedule.
    #[must_use]
    pub fn armed(waiting_minutes: u32, next_run_time: DateTime<Utc>) -> Self {
        Self {
            is_scheduled: true,
            waiting_minutes,
            next_run_time: Some(next_run_time),
        }
    }

    /// Disabled schedule keeping the last interval.
    #[must_use]
    pub fn disabled(waiting_minutes: u32) -> Self {
        Self {
            is_scheduled: false,
            waiting_minutes,
            next_run_time: None,
        }
    }
}

/// Pagination for target listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    /// Largest page the store will return.
    pub const MAX_LIMIT: u64 = 100;
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::MAX_LIMIT,
        }
    }
}
