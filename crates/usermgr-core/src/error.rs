//! Orchestrator-level error: a client-visible [`ErrorKind`] plus a
//! free-text detail for logs, keeping the classified kind separate from the
//! message that explains it.

use usermgr_types::error::ErrorKind;

/// An error produced by a handler in [`crate::handlers`].
///
/// `kind` is what crosses the HTTP boundary (via `ErrorKind::to_body`);
/// `detail` is logged but never serialized to the client.
#[derive(Debug)]
pub struct OrchestratorError {
    /// The client-visible classification.
    pub kind: ErrorKind,
    /// Free-text detail, logged but not exposed.
    pub detail: String,
}

impl OrchestratorError {
    /// Build an error from a kind and a detail message.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind.as_str(), self.detail)
    }
}

impl std::error::Error for OrchestratorError {}

/// Shorthand for `Result<T, OrchestratorError>`.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let e = OrchestratorError::new(ErrorKind::UserExists, "dn already present");
        assert_eq!(e.to_string(), "user_exists (dn already present)");
    }
}
