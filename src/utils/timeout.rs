//! Default timeouts and async timeout wrappers.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for dialing a peer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a server waits for live sessions to drain on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default freshness window of a frame token
pub const TOKEN_TTL: Duration = Duration::from_secs(30);

/// Run `future` with a deadline, mapping elapsed deadlines to `ProtocolError::Timeout`.
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}
