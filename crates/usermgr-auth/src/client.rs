//! Test-support SPNEGO *client* helper, mirroring
//! `clumsy/gssapi/client.py`'s `NegotiateMixin` retry loop.
//!
//! This is not a CLI front-end — it exists so `usermgr-testing`'s
//! integration harness can drive the HTTP surface as an authenticated
//! caller. Initiating a context still requires a real Kerberos ticket
//! cache, so tests built on this helper are marked `#[ignore]`.

use libgssapi::{
    context::{ClientCtx, CtxFlags},
    credential::{Cred, CredUsage},
    name::Name,
    oid::{GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE, OidSet},
};
use std::sync::Mutex;

use crate::error::AuthError;

const GSS_MECH_SPNEGO: libgssapi::oid::Oid =
    libgssapi::oid::Oid::from_slice(&[0x2b, 0x06, 0x01, 0x05, 0x05, 0x02]);

/// Drives a client-side SPNEGO handshake against a configured service
/// principal, for use by integration tests that need to present an
/// `Authorization: Negotiate` header.
pub struct NegotiateClient {
    spn: String,
    context: Mutex<Option<ClientCtx>>,
}

impl NegotiateClient {
    /// `spn` is the target service's host-based principal name.
    #[must_use]
    pub fn new(spn: impl Into<String>) -> Self {
        Self {
            spn: spn.into(),
            context: Mutex::new(None),
        }
    }

    /// Start the handshake, returning the first token to send as
    /// `Authorization: Negotiate <base64(token)>`.
    pub fn initialize(&self) -> Result<Vec<u8>, AuthError> {
        let service_name = Name::new(self.spn.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .map_err(|e| AuthError::Gssapi(format!("failed to build service name: {e}")))?;

        let mut mechs =
            OidSet::new().map_err(|e| AuthError::Gssapi(format!("failed to build OID set: {e}")))?;
        mechs
            .add(&GSS_MECH_SPNEGO)
            .map_err(|e| AuthError::Gssapi(format!("failed to add SPNEGO mechanism: {e}")))?;
        mechs
            .add(&GSS_MECH_KRB5)
            .map_err(|e| AuthError::Gssapi(format!("failed to add Kerberos mechanism: {e}")))?;

        let cred = Cred::acquire(None, None, CredUsage::Initiate, Some(&mechs))
            .map_err(|e| AuthError::Gssapi(format!("failed to acquire credentials: {e}")))?;

        let mut ctx = ClientCtx::new(
            Some(cred),
            service_name,
            CtxFlags::GSS_C_MUTUAL_FLAG,
            Some(&GSS_MECH_SPNEGO),
        );

        let token = ctx
            .step(None, None)
            .map_err(|e| AuthError::Gssapi(format!("failed to initialize context: {e}")))?
            .ok_or(AuthError::NoInitiatorName)?;

        *self.context.lock().expect("context mutex poisoned") = Some(ctx);
        Ok(token.to_vec())
    }

    /// Step the handshake with a server-provided challenge token (decoded
    /// from a `WWW-Authenticate: Negotiate <b64>` header), returning the
    /// next token to send, or `None` once the handshake is complete.
    pub fn step(&self, server_token: &[u8]) -> Result<Option<Vec<u8>>, AuthError> {
        let mut guard = self.context.lock().expect("context mutex poisoned");
        let ctx = guard.as_mut().ok_or(AuthError::MissingCredentials)?;
        ctx.step(Some(server_token), None)
            .map(|opt| opt.map(|t| t.to_vec()))
            .map_err(|e| AuthError::Gssapi(format!("GSSAPI step failed: {e}")))
    }
}

/// Formats a token as an `Authorization: Negotiate <base64>` header value.
#[must_use]
pub fn negotiate_header(token: &[u8]) -> String {
    use base64::Engine;
    format!(
        "Negotiate {}",
        base64::engine::general_purpose::STANDARD.encode(token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_header_format() {
        let header = negotiate_header(b"hello");
        assert!(header.starts_with("Negotiate "));
    }

    #[test]
    #[ignore = "requires a real Kerberos ticket cache"]
    fn initialize_against_real_kdc() {
        let client = NegotiateClient::new("usermgr@cluster.example.org");
        client.initialize().unwrap();
    }
}
