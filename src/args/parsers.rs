use std::time::Duration;

use crate::config::parse_duration_value;
use crate::error::{AppError, AppResult, ValidationError};
use crate::fleet::ClientType;

pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::validation)
}

/// Accepts zero (`0s`), for offsets like the burn-in window.
pub(crate) fn parse_offset_arg(s: &str) -> AppResult<Duration> {
    match parse_duration_value(s) {
        Ok(duration) => Ok(duration),
        Err(ValidationError::DurationZero) => Ok(Duration::ZERO),
        Err(err) => Err(AppError::validation(err)),
    }
}

pub(super) fn parse_positive_u32(s: &str) -> AppResult<u32> {
    let value: u32 = s
        .trim()
        .parse()
        .map_err(|err| AppError::validation(ValidationError::InvalidNumber { source: err }))?;
    if value == 0 {
        return Err(AppError::validation(ValidationError::ValueTooSmall {
            min: 1,
        }));
    }
    Ok(value)
}

pub(super) fn parse_client_type(s: &str) -> AppResult<ClientType> {
    s.parse::<ClientType>().map_err(AppError::validation)
}
