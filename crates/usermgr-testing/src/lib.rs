//! Test infrastructure for usermgr control-plane development.
//!
//! - [`mock_server`]: a scripted HTTP-over-UNIX-domain-socket server
//!   standing in for `mkhomedird`/`nscdflushd`.
//! - [`fake_nameservice`]: an in-memory [`usermgr_core::NameService`] fake
//!   for controlling exactly what resolves in handler tests.
//!
//! `usermgr-directory` and `usermgr-kerberos` are not faked here: both wrap
//! a concrete external process/protocol (`ldap3`'s wire client, a spawned
//! `kadmin`) with no trait seam in `usermgr-core::AppContext`, so exercising
//! them for real requires a live LDAP server or `kadmin`/KDC respectively —
//! out of reach for a unit-test crate that mustn't invent network fixtures
//! wholesale. Their own crates carry unit tests for the parts that don't
//! need a live peer (filter escaping, error classification, prompt
//! parsing, command construction).

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fake_nameservice;
pub mod mock_server;

pub use fake_nameservice::FakeNameService;
pub use mock_server::{MockServerBuilder, MockServerError, MockSiblingServer};
