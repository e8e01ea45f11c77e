//! Kerberos driver errors.

use thiserror::Error;

/// Errors `KerberosAdmin` can produce.
#[derive(Debug, Error)]
pub enum KerberosError {
    /// `get_principal` exited non-zero — the principal does not exist.
    #[error("principal not found")]
    NotFound,
    /// `kadmin` exited non-zero for a reason other than "not found".
    #[error("kadmin command failed: {0}")]
    CommandFailed(String),
    /// A prompt from `kadmin` did not match the expected fixed text; the
    /// dialogue cannot safely continue (a stale prompt could mean the
    /// password would otherwise be written to the wrong place).
    #[error("unexpected kadmin prompt: {0:?}")]
    UnexpectedPrompt(String),
    /// Failed to spawn or communicate with the `kadmin` child process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KerberosError {
    /// Whether this failure should be treated as a warning rather than a
    /// fatal error: a missing principal is a warning, not an error.
    #[must_use]
    pub fn is_tolerable(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_tolerable() {
        assert!(KerberosError::NotFound.is_tolerable());
        assert!(!KerberosError::CommandFailed("x".into()).is_tolerable());
    }
}
