//! Input validation shared by the services.
//!
//! Every check runs before any store mutation.

use url::Url;

use crate::error::{CoreError, CoreResult};

/// Default recurring interval when a schedule is first enabled
pub const DEFAULT_WAITING_MINUTES: u32 = 60;

/// Longest accepted recurring interval (one week)
pub const MAX_WAITING_MINUTES: u32 = 10_080;

const MAX_NAME_LEN: usize = 200;

/// Trims and checks a target name.
pub fn target_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::ValidationError(
            "Target name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::ValidationError(format!(
            "Target name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Checks that `value` is an absolute `http`/`https` URL with a host.
///
/// Returns the trimmed input, not the normalized URL, so stored values match what
/// the user typed.
pub fn http_url(value: &str) -> CoreResult<String> {
    let value = value.trim();
    let parsed = Url::parse(value)
        .map_err(|e| CoreError::ValidationError(format!("Invalid URL '{value}': {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::ValidationError(format!(
            "URL must use http or https: '{value}'"
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::ValidationError(format!(
            "URL has no host: '{value}'"
        )));
    }
    Ok(value.to_string())
}

/// Optional URL field; empty strings count as absent.
pub fn optional_http_url(value: Option<&str>) -> CoreResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => http_url(v).map(Some),
    }
}

/// Checks a recurring interval, defaulting to [`DEFAULT_WAITING_MINUTES`].
pub fn waiting_minutes(value: Option<i64>) -> CoreResult<u32> {
    let Some(minutes) = value else {
        return Ok(DEFAULT_WAITING_MINUTES);
    };
    if minutes < 1 || minutes > i64::from(MAX_WAITING_MINUTES) {
        return Err(CoreError::ValidationError(format!(
            "waiting_minutes must be between 1 and {MAX_WAITING_MINUTES}, got {minutes}"
        )));
    }
    u32::try_from(minutes).map_err(|e| CoreError::ValidationError(e.to_string()))
}
