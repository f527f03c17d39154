//! Shared helpers

pub mod datetime;
pub mod validation;
