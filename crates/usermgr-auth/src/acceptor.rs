//! GSSAPI accept-mode context management.
//!
//! Drives a `ServerCtx` in `Accept` mode using the SPNEGO mechanism OID,
//! matching `clumsy/gssapi/server.py`'s `makeContext`.

use std::sync::Mutex;

use libgssapi::{
    context::ServerCtx,
    credential::{Cred, CredUsage},
    name::Name,
    oid::{GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE, OidSet},
};

use crate::error::AuthError;

/// SPNEGO mechanism OID (1.3.6.1.5.5.2), kept alongside Kerberos 5 in the
/// acquired credential's mechanism set so a client may negotiate either.
const GSS_MECH_SPNEGO: libgssapi::oid::Oid =
    libgssapi::oid::Oid::from_slice(&[0x2b, 0x06, 0x01, 0x05, 0x05, 0x02]);

/// Holds the long-lived server credential (loaded from the service
/// principal's keytab via `KRB5_KTNAME`) and mints fresh [`ServerCtx`]
/// instances, one per connection.
pub struct SpnegoAcceptor {
    service_name: String,
}

impl SpnegoAcceptor {
    /// `service_name` is the host-based service principal this process
    /// accepts tickets for, e.g. `usermgr@cluster.example.org`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Acquire a fresh accept-mode credential and build an empty
    /// [`ServerCtx`] ready to `step` the first client token.
    ///
    /// Credential acquisition reads the keytab named by the process's
    /// `KRB5_KTNAME` environment variable (set by the deployment, not by
    /// this crate — keytab discovery is a GSSAPI/krb5 library concern).
    pub fn new_context(&self) -> Result<ServerCtx, AuthError> {
        let name = Name::new(self.service_name.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .map_err(|e| AuthError::Gssapi(format!("failed to build service name: {e}")))?;

        let mut mechs =
            OidSet::new().map_err(|e| AuthError::Gssapi(format!("failed to build OID set: {e}")))?;
        mechs
            .add(&GSS_MECH_SPNEGO)
            .map_err(|e| AuthError::Gssapi(format!("failed to add SPNEGO mechanism: {e}")))?;
        mechs
            .add(&GSS_MECH_KRB5)
            .map_err(|e| AuthError::Gssapi(format!("failed to add Kerberos mechanism: {e}")))?;

        let cred = Cred::acquire(Some(&name), None, CredUsage::Accept, Some(&mechs))
            .map_err(|e| AuthError::Gssapi(format!("failed to acquire server credential: {e}")))?;

        Ok(ServerCtx::new(cred))
    }
}

impl std::fmt::Debug for SpnegoAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpnegoAcceptor")
            .field("service_name", &self.service_name)
            .finish()
    }
}

/// The per-connection GSSAPI state the middleware steps on every request.
///
/// Wrapped in an `Arc<Mutex<_>>` by the HTTP layer and attached to a
/// connection's requests via an axum `Extension`, mirroring
/// `clumsy/gssapi/server.py` caching `connctx.gss` on the connection object.
pub type ConnectionContext = std::sync::Arc<Mutex<Option<ServerCtx>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_panic() {
        let acceptor = SpnegoAcceptor::new("usermgr@cluster.example.org");
        let debug = format!("{acceptor:?}");
        assert!(debug.contains("usermgr@cluster.example.org"));
    }
}
