//! Wall-clock helpers shared by token stamping and freshness checks.

use crate::error::{constants, ProtocolError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current timestamp in milliseconds since the Unix epoch
///
/// # Errors
/// Returns a `ProtocolError::Custom` if the system time is earlier than UNIX_EPOCH
pub fn current_timestamp() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .map_err(|_| ProtocolError::Custom(constants::ERR_SYSTEM_TIME.into()))
}

/// Signed age of `timestamp` relative to now, in milliseconds.
/// Negative when the timestamp lies in the future.
pub fn age_millis(timestamp: u64) -> Result<i64> {
    let now = current_timestamp()?;
    Ok(now as i64 - timestamp as i64)
}
