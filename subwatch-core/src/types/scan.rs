//! Scan run types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiscoveredSubdomain, ScanStatus, Subdomain};

/// What caused a scan to be dispatched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanTrigger {
    Manual,
    Scheduled,
}

impl ScanTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }
}

impl FromStr for ScanTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!("unknown scan trigger '{other}'")),
        }
    }
}

/// Lifecycle of a single scan run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScanRunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl ScanRunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Whether the run still counts as the target's outstanding scan.
    #[must_use]
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Target status mirrored while this run is outstanding.
    #[must_use]
    pub fn target_status(self) -> ScanStatus {
        match self {
            Self::Queued => ScanStatus::Queued,
            Self::Running => ScanStatus::Running,
            Self::Succeeded | Self::Failed | Self::TimedOut => ScanStatus::Idle,
        }
    }
}

impl fmt::Display for ScanRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(format!("unknown scan run status '{other}'")),
        }
    }
}

/// Durable record of one dispatched scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRun {
    pub id: i64,
    pub target_id: i64,
    pub trigger: ScanTrigger,
    pub status: ScanRunStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub discovered_count: u32,
}

/// How an outstanding run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanClosure {
    pub status: ScanRunStatus,
    pub error: Option<String>,
    pub discovered_count: u32,
    pub finished_at: DateTime<Utc>,
}

/// Store-side result of firing one due tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The schedule was disabled or re-armed concurrently; nothing written
    Stale,
    /// Schedule advanced; a scan was already outstanding
    Skipped,
    /// Schedule advanced and a scheduled run queued
    Fired(ScanRun),
}

/// Outcome reported by a scan worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Succeeded {
        #[serde(default)]
        subdomains: Vec<DiscoveredSubdomain>,
    },
    Failed {
        error: String,
    },
}

/// Result of an accepted dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub accepted: bool,
    pub status: ScanStatus,
    pub scan_run_id: i64,
}

/// Result of applying a completion report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub run: ScanRun,
    pub status: ScanStatus,
    /// Subdomains seen for the first time
    pub new_subdomains: Vec<Subdomain>,
}

/// Summary of one scheduler pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    /// Targets that got a scheduled scan queued
    pub fired: Vec<i64>,
    /// Targets whose tick was dropped because a scan was outstanding
    pub skipped: Vec<i64>,
}

impl TickReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.skipped.is_empty()
    }
}
