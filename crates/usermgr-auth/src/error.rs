//! SPNEGO/GSSAPI error types.

use thiserror::Error;

/// Errors the SPNEGO acceptor (or its test-support client counterpart) can
/// produce.
#[derive(Debug, Error)]
pub enum AuthError {
    /// GSSAPI call failed.
    #[error("GSSAPI error: {0}")]
    Gssapi(String),
    /// The `Authorization` header was missing, malformed, or not `Negotiate`.
    #[error("missing or malformed Negotiate credentials")]
    MissingCredentials,
    /// The decoded token failed base64 decoding.
    #[error("invalid base64 in Negotiate token: {0}")]
    InvalidToken(String),
    /// The security context completed but did not resolve to an
    /// initiator principal.
    #[error("no initiator principal on completed context")]
    NoInitiatorName,
}
