//! Directory errors, distinguishing the two outcomes the orchestrator
//! needs to tell apart (already-exists, no-such-object) from everything
//! else.

use thiserror::Error;

/// LDAP result code for `entryAlreadyExists`.
const RC_ALREADY_EXISTS: u32 = 68;
/// LDAP result code for `noSuchObject`.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code for `attributeOrValueExists` (adding a `memberUid`
/// value that is already present).
const RC_ATTR_OR_VALUE_EXISTS: u32 = 20;

/// Errors `DirectoryClient` can produce.
///
/// Every other LDAP failure folds into [`DirectoryError::Protocol`] rather
/// than leaving a bare, unclassified error unhandled: any LDAP failure that
/// isn't one of the two semantically distinct outcomes above is uniformly
/// classified as a protocol failure, which the orchestrator then reports
/// as its own generic `ldap` error kind.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// `add` targeted a DN that already exists.
    #[error("entry already exists")]
    AlreadyExists,
    /// `delete`/`modify` targeted a DN, or removed a value, that is gone.
    #[error("no such object")]
    NoSuchObject,
    /// Could not establish or bind a connection.
    #[error("ldap connection failed: {0}")]
    Connect(String),
    /// Any other LDAP protocol-level failure.
    #[error("ldap protocol error: {0}")]
    Protocol(String),
}

impl DirectoryError {
    /// Classify a raw `ldap3::LdapError` into a `DirectoryError`.
    pub(crate) fn from_ldap(e: ldap3::LdapError) -> Self {
        if let ldap3::LdapError::LdapResult { result } = &e {
            match result.rc {
                RC_ALREADY_EXISTS | RC_ATTR_OR_VALUE_EXISTS => return Self::AlreadyExists,
                RC_NO_SUCH_OBJECT => return Self::NoSuchObject,
                _ => {}
            }
        }
        Self::Protocol(e.to_string())
    }

    /// Whether this error represents a benign "already done" outcome the
    /// caller may log as a warning instead of failing the operation.
    #[must_use]
    pub fn is_tolerable(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::NoSuchObject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_is_tolerable() {
        assert!(DirectoryError::AlreadyExists.is_tolerable());
        assert!(DirectoryError::NoSuchObject.is_tolerable());
        assert!(!DirectoryError::Protocol("x".into()).is_tolerable());
        assert!(!DirectoryError::Connect("x".into()).is_tolerable());
    }
}
