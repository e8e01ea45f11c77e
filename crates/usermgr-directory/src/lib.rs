//! Thin async LDAP client wrapping `ldap3`, bound to the fixed
//! people/group subtrees a deployment configures.
//!
//! A fresh connection is opened per call (see [`DirectoryClient::connect`])
//! and left for the caller to drop, since a new LDAP connection is spawned
//! per request rather than pooled.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod error;
mod filter;

pub use error::DirectoryError;
pub use filter::escape_filter_value;

use ldap3::{Ldap, LdapConnAsync, Mod, Scope, SearchEntry};
use std::collections::HashSet;
use usermgr_types::config::LdapConfig;

/// Bound LDAP connection plus the fixed subtree DNs it operates against.
///
/// Cheap to construct repeatedly; the expensive part ([`Self::connect`])
/// happens per call site, not per `DirectoryClient`.
#[derive(Clone)]
pub struct DirectoryClient {
    config: LdapConfig,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("server", &self.config.server)
            .field("base_people", &self.config.base_people)
            .field("base_group", &self.config.base_group)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Build a client from the `[ldap]` section of [`usermgr_types::Config`].
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    /// The base DN people entries are added under.
    #[must_use]
    pub fn base_people(&self) -> &str {
        &self.config.base_people
    }

    /// The base DN group entries are added under.
    #[must_use]
    pub fn base_group(&self) -> &str {
        &self.config.base_group
    }

    /// Extra object classes appended to the fixed set on user entries.
    #[must_use]
    pub fn extra_classes(&self) -> &[String] {
        &self.config.extra_classes
    }

    /// Open and simple-bind a fresh connection.
    #[tracing::instrument(skip(self), fields(server = %self.config.server))]
    pub async fn connect(&self) -> Result<Ldap, DirectoryError> {
        let (conn, mut ldap) = LdapConnAsync::new(&self.config.server)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;
        ldap3::drive!(conn);
        ldap.simple_bind(&self.config.user, &self.config.password)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;
        Ok(ldap)
    }

    /// `add(entry)`: create `dn` with the given object classes and
    /// attributes. Returns [`DirectoryError::AlreadyExists`] if the DN is
    /// already present.
    pub async fn add(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        attrs: Vec<(&str, HashSet<&str>)>,
    ) -> Result<(), DirectoryError> {
        ldap.add(dn, attrs)
            .await
            .map_err(DirectoryError::from_ldap)?
            .success()
            .map_err(DirectoryError::from_ldap)?;
        Ok(())
    }

    /// `delete(dn)`. Returns [`DirectoryError::NoSuchObject`] if `dn` is
    /// already gone.
    pub async fn delete(&self, ldap: &mut Ldap, dn: &str) -> Result<(), DirectoryError> {
        ldap.delete(dn)
            .await
            .map_err(DirectoryError::from_ldap)?
            .success()
            .map_err(DirectoryError::from_ldap)?;
        Ok(())
    }

    /// `search(base, scope, filter) -> list`. `filter` is interpolated by
    /// the caller; use [`escape_filter_value`] on any untrusted component.
    pub async fn search(
        &self,
        ldap: &mut Ldap,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<&str>,
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let (entries, _res) = ldap
            .search(base, scope, filter, attrs)
            .await
            .map_err(DirectoryError::from_ldap)?
            .success()
            .map_err(DirectoryError::from_ldap)?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    /// `modify(entry)`: apply a list of attribute modifications to `dn`.
    ///
    /// Adding a value already present on a multi-valued attribute (e.g.
    /// `memberUid`) returns [`DirectoryError::AlreadyExists`]; the
    /// orchestrator treats that as success for `add_member`.
    pub async fn modify(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        mods: Vec<Mod<String>>,
    ) -> Result<(), DirectoryError> {
        ldap.modify(dn, mods)
            .await
            .map_err(DirectoryError::from_ldap)?
            .success()
            .map_err(DirectoryError::from_ldap)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig {
            server: "ldap://localhost:389".into(),
            user: "cn=admin,dc=example,dc=org".into(),
            password: "secret".into(),
            base_people: "ou=people,dc=example,dc=org".into(),
            base_group: "ou=groups,dc=example,dc=org".into(),
            extra_classes: vec!["eduPerson".into()],
        }
    }

    #[test]
    fn exposes_configured_subtrees() {
        let client = DirectoryClient::new(config());
        assert_eq!(client.base_people(), "ou=people,dc=example,dc=org");
        assert_eq!(client.base_group(), "ou=groups,dc=example,dc=org");
        assert_eq!(client.extra_classes(), ["eduPerson".to_string()]);
    }

    #[test]
    fn debug_does_not_leak_password() {
        let client = DirectoryClient::new(config());
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
    }
}
