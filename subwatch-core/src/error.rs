//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use crate::types::ScanStatus;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Target not found
    #[error("Target not found: {0}")]
    TargetNotFound(i64),

    /// Subdomain not found (under the given target)
    #[error("Subdomain not found: {subdomain_id} (target {target_id})")]
    SubdomainNotFound { target_id: i64, subdomain_id: i64 },

    /// A scan is already outstanding for the target
    #[error("Scan already in progress for target {target_id} ({status})")]
    ScanInProgress { target_id: i64, status: ScanStatus },

    /// Completion was reported for a target with no outstanding scan
    #[error("No scan outstanding for target {0}")]
    NoScanOutstanding(i64),

    /// Another target already uses this name
    #[error("Target name already taken: {0}")]
    TargetNameTaken(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Alert delivery failed
    #[error("Notification error: {0}")]
    NotificationError(String),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::TargetNotFound(_)
            | Self::SubdomainNotFound { .. }
            | Self::ScanInProgress { .. }
            | Self::NoScanOutstanding(_)
            | Self::TargetNameTaken(_)
            | Self::ValidationError(_) => true,
            Self::SerializationError(_) | Self::StorageError(_) | Self::NotificationError(_) => {
                false
            }
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageError(_) | Self::NotificationError(_))
    }

    /// Whether the request conflicts with the current state of the target.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ScanInProgress { .. } | Self::NoScanOutstanding(_) | Self::TargetNameTaken(_)
        )
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_expected_but_not_retryable() {
        let err = CoreError::ScanInProgress {
            target_id: 7,
            status: ScanStatus::Running,
        };
        assert!(err.is_expected());
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Scan already in progress for target 7 (running)"
        );
    }

    #[test]
    fn storage_errors_are_retryable() {
        let err = CoreError::StorageError("database is locked".to_string());
        assert!(!err.is_expected());
        assert!(err.is_retryable());
    }

    #[test]
    fn serializes_with_code_and_details() {
        let err = CoreError::TargetNotFound(3);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "TargetNotFound");
        assert_eq!(json["details"], 3);
    }
}
