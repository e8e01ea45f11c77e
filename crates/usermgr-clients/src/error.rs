//! Errors for the sibling-daemon clients.

use thiserror::Error;

/// Errors a [`crate::HomedirClient`] or [`crate::CacheFlushClient`] call
/// can produce.
#[derive(Debug, Error)]
pub enum SiblingError {
    /// Could not establish the UNIX-domain socket connection.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The request was sent but the connection failed before a complete
    /// response arrived.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body was not valid JSON, or not shaped as expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}
