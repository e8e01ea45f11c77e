//! Shared, network-free data model for the usermgr control plane.
//!
//! This crate holds the request/response shapes exchanged between the
//! provisioning orchestrator ([`UserRequest`], [`Account`], [`Group`],
//! [`PrincipalRecord`], [`DeleteToken`]), the layered [`Config`], and the
//! closed set of client-visible [`ErrorKind`]s. Nothing here talks to LDAP,
//! Kerberos, or a socket — every other crate in the workspace depends on
//! this one, not the other way around.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod ascii;
pub mod config;
pub mod error;
pub mod model;

pub use config::{Config, ConfigError};
pub use error::ErrorKind;
pub use model::{Account, DeleteToken, Group, PrincipalRecord, UserRequest};
