//! Layered configuration, deserialized from the file named by the
//! `SETTINGS_FILE` environment variable.

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Failure modes of [`Config::load`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `SETTINGS_FILE` was not set in the process environment.
    #[error("SETTINGS_FILE environment variable is not set")]
    MissingSettingsFile,
    /// The named file could not be read or did not parse into a [`Config`].
    #[error("failed to load {path}: {source}")]
    Load {
        /// The path `SETTINGS_FILE` named.
        path: PathBuf,
        /// The underlying figment/TOML error.
        source: figment::Error,
    },
}

/// Top-level configuration shared by `usermgr-server` and, for the keys it
/// needs, by the satellite daemons.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Listening socket and its ownership/mode.
    pub socket: SocketConfig,
    /// uid/gid allocation ranges.
    pub allocation: AllocationConfig,
    /// LDAP directory endpoint and schema knobs.
    pub ldap: LdapConfig,
    /// Kerberos admin credentials and principal defaults.
    pub kerberos: KerberosConfig,
    /// Sibling daemon sockets.
    pub siblings: SiblingsConfig,
    /// Home directory path template, e.g. `/home/{user}`.
    pub home_template: String,
    /// Principal (local part) allowed to create users.
    pub authorization_create: String,
    /// If true, login/group names are synthesized from the reserved
    /// uid/gid (`user-<quint>`/`group-<quint>`) instead of derived from the
    /// request body. Default `true`, matching "the latest revision of the
    /// core".
    #[serde(default = "default_true")]
    pub synthesize_names_from_uid: bool,
    /// Home-directory daemon only: path templates and their create/delete
    /// policy. Empty for `usermgr-server`.
    #[serde(default)]
    pub directories: Vec<DirectoryRule>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the TOML file named by the `SETTINGS_FILE`
    /// environment variable, the one bootstrap step every
    /// binary in the workspace performs identically.
    pub fn load() -> Result<Self, ConfigError> {
        let path: PathBuf = std::env::var_os("SETTINGS_FILE")
            .ok_or(ConfigError::MissingSettingsFile)?
            .into();
        Figment::new()
            .merge(Toml::file(&path))
            .extract()
            .map_err(|source| ConfigError::Load { path, source })
    }
}

/// Listening socket and its ownership/mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocketConfig {
    /// Filesystem path of the UNIX-domain socket.
    pub path: PathBuf,
    /// Owning user name to `chown` the socket to after binding.
    pub user: String,
    /// Owning group name to `chown` the socket to after binding.
    pub group: String,
    /// Octal file mode, e.g. `0o660`.
    pub mode: u32,
}

/// uid/gid allocation ranges. `MIN_UID..MAX_UID` and `MIN_GID..MAX_GID` must
/// not overlap; that invariant is a deployment constraint this crate does
/// not enforce at load time.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AllocationConfig {
    /// Lower (inclusive) bound of the uid range.
    pub min_uid: u32,
    /// Upper (exclusive) bound of the uid range.
    pub max_uid: u32,
    /// Lower (inclusive) bound of the gid range.
    pub min_gid: u32,
    /// Upper (exclusive) bound of the gid range.
    pub max_gid: u32,
}

impl AllocationConfig {
    /// Whether `uid` falls within `[min_uid, max_uid)`.
    #[must_use]
    pub fn uid_in_range(&self, uid: u32) -> bool {
        (self.min_uid..self.max_uid).contains(&uid)
    }

    /// Whether `gid` falls within `[min_gid, max_gid)`.
    #[must_use]
    pub fn gid_in_range(&self, gid: u32) -> bool {
        (self.min_gid..self.max_gid).contains(&gid)
    }
}

/// LDAP directory endpoint and schema knobs.
#[derive(Clone, Deserialize, Serialize)]
pub struct LdapConfig {
    /// Server URI, e.g. `ldap://directory.internal:389`.
    pub server: String,
    /// Bind DN or simple-auth user name.
    pub user: String,
    /// Bind password.
    pub password: String,
    /// Base DN people are added under, e.g. `ou=people,dc=example,dc=org`.
    pub base_people: String,
    /// Base DN groups are added under, e.g. `ou=groups,dc=example,dc=org`.
    pub base_group: String,
    /// Extra object classes appended to the fixed set on user entries.
    #[serde(default)]
    pub extra_classes: Vec<String>,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("base_people", &self.base_people)
            .field("base_group", &self.base_group)
            .field("extra_classes", &self.extra_classes)
            .finish()
    }
}

/// Kerberos admin credentials and principal defaults.
#[derive(Clone, Deserialize, Serialize)]
pub struct KerberosConfig {
    /// `kadmin -p` principal, e.g. `usermgr/admin@EXAMPLE.ORG`.
    pub user: String,
    /// Path to the keytab `kadmin -t` reads.
    pub keytab: PathBuf,
    /// Default expiry string passed to `addPrincipal`, if any.
    #[serde(default)]
    pub expire: Option<String>,
}

impl std::fmt::Debug for KerberosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KerberosConfig")
            .field("user", &self.user)
            .field("keytab", &self.keytab)
            .field("expire", &self.expire)
            .finish()
    }
}

/// Sibling daemon sockets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiblingsConfig {
    /// Cache-flush daemon's UNIX-domain socket path.
    pub nscdflushd_socket: PathBuf,
    /// Home-directory daemon's UNIX-domain socket path.
    pub mkhomedird_socket: PathBuf,
}

/// A `DIRECTORIES` entry for the home-directory daemon.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryRule {
    /// Path template, e.g. `/home/{user}` or `/scratch/{user}`.
    pub path_template: String,
    /// What to do with this path on user creation.
    pub create: CreatePolicy,
    /// Whether this path is removed on user deletion.
    #[serde(default)]
    pub delete: bool,
    /// Whether leftover group ACLs on this path are revoked on group GC.
    #[serde(default)]
    pub delete_group: bool,
}

/// The `create` policy of a [`DirectoryRule`]: `false`, `true`, or a
/// skeleton directory to copy from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CreatePolicy {
    /// Create (`true`) or skip (`false`) an empty directory owned by the user.
    Bool(bool),
    /// Create the directory and copy the given skeleton into it.
    Skeleton(PathBuf),
}

impl CreatePolicy {
    /// Whether this policy creates anything at all.
    #[must_use]
    pub fn creates(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Skeleton(_) => true,
        }
    }

    /// The skeleton directory to copy, if any.
    #[must_use]
    pub fn skeleton(&self) -> Option<&PathBuf> {
        match self {
            Self::Skeleton(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_ranges() {
        let a = AllocationConfig {
            min_uid: 1000,
            max_uid: 2000,
            min_gid: 2000,
            max_gid: 3000,
        };
        assert!(a.uid_in_range(1500));
        assert!(!a.uid_in_range(2000));
        assert!(!a.gid_in_range(1999));
    }

    #[test]
    fn ldap_config_redacts_password_in_debug() {
        let c = LdapConfig {
            server: "ldap://x".into(),
            user: "cn=admin".into(),
            password: "hunter2".into(),
            base_people: "ou=people".into(),
            base_group: "ou=groups".into(),
            extra_classes: vec![],
        };
        let debug = format!("{c:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn create_policy_bool_variants() {
        assert!(!CreatePolicy::Bool(false).creates());
        assert!(CreatePolicy::Bool(true).creates());
        assert!(CreatePolicy::Skeleton("/etc/skel".into()).creates());
    }
}
