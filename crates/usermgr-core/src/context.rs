//! [`AppContext`]: everything a handler needs to talk to the outside
//! world, built once at startup and shared (cheaply cloned, `Arc`-backed
//! fields throughout) across every request, the same way the two sibling
//! HTTP clients are created once and reused, extended here to the
//! directory and Kerberos clients as well.

use std::sync::Arc;

use usermgr_clients::{CacheFlushClient, HomedirClient};
use usermgr_directory::DirectoryClient;
use usermgr_kerberos::KerberosAdmin;
use usermgr_types::config::Config;

use crate::nameservice::NameService;
use crate::reservation::ReservationSets;

/// Shared dependencies every orchestrator handler is built from.
#[derive(Clone)]
pub struct AppContext {
    /// Layered configuration (allocation ranges, templates, authorization).
    pub config: Arc<Config>,
    /// LDAP directory client.
    pub directory: DirectoryClient,
    /// `kadmin` driver.
    pub kerberos: Arc<KerberosAdmin>,
    /// Home-directory sibling client.
    pub homedir: HomedirClient,
    /// Cache-flush sibling client.
    pub cacheflush: CacheFlushClient,
    /// Process-wide uid/gid/name reservation sets.
    pub reservations: Arc<ReservationSets>,
    /// Host name-service resolver.
    pub nameservice: Arc<dyn NameService>,
}

impl AppContext {
    /// Assemble a context from configuration and the host name-service
    /// implementation. `usermgr-server`'s `main` calls this once at
    /// startup; tests build an `AppContext` directly with a fake
    /// [`NameService`] instead.
    #[must_use]
    pub fn new(config: Config, nameservice: Arc<dyn NameService>) -> Self {
        let directory = DirectoryClient::new(config.ldap.clone());
        let kerberos = KerberosAdmin::new(config.kerberos.user.clone(), config.kerberos.keytab.clone());
        let homedir = HomedirClient::new(config.siblings.mkhomedird_socket.clone());
        let cacheflush = CacheFlushClient::new(config.siblings.nscdflushd_socket.clone());
        Self {
            config: Arc::new(config),
            directory,
            kerberos: Arc::new(kerberos),
            homedir,
            cacheflush,
            reservations: Arc::new(ReservationSets::new()),
            nameservice,
        }
    }
}
