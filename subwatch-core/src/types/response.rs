//! Response envelope types

use serde::{Deserialize, Serialize};

/// Envelope for successful responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Acknowledgement for mutations without a payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    #[must_use]
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
