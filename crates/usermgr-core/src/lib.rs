//! The user/group provisioning orchestrator: identifier
//! allocation, the rollback scope, the consistency wait, and the five HTTP
//! handlers built on top of them.
//!
//! Everything here is wired through [`context::AppContext`], a bundle of
//! the shared LDAP/Kerberos/sibling clients and the two process-wide
//! reservation sets.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod consistency;
pub mod context;
pub mod error;
pub mod handlers;
pub mod nameservice;
pub mod reservation;
pub mod rollback;

pub use context::AppContext;
pub use error::{OrchestratorError, Result};
pub use nameservice::{HostNameService, NameService};
pub use reservation::ReservationSets;
pub use rollback::RollbackScope;
