//! SPNEGO/GSSAPI request authentication.
//!
//! The acceptor side runs a GSSAPI `ServerCtx` per connection, stepping it
//! with each `Authorization: Negotiate` header until it completes, at which
//! point the caller's principal is attached to the request. See
//! [`middleware::spnego_middleware`] for the axum integration and
//! [`acceptor::SpnegoAcceptor`] for context/credential management.

#![warn(missing_docs)]
#![allow(unsafe_code)] // libgssapi's safe wrapper still needs unsafe for OID table construction.

mod acceptor;
mod client;
mod error;
mod middleware;

pub use acceptor::{ConnectionContext, SpnegoAcceptor};
pub use client::{negotiate_header, NegotiateClient};
pub use error::AuthError;
pub use middleware::{spnego_middleware, AuthenticatedPrincipal};
