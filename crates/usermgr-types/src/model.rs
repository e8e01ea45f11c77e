//! Core data model: requests, persisted entities, and the delete-token
//! handshake.

use serde::{Deserialize, Serialize};

/// Inbound request body for `POST /user`.
///
/// Either `username` or both `first_name` and `last_name` must be present;
/// this invariant is checked by [`UserRequest::is_valid`] rather than by the
/// type system, since the wire shape has every field optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserRequest {
    /// Given name, used as an allocator candidate source.
    #[serde(rename = "firstName", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name, used as an allocator candidate source.
    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Preferred login name, tried before any derived candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// ORCID identifier, stored verbatim on the LDAP entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    /// Free-text authorization note, stored as `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    /// Contact email, ASCII-stripped before being written to LDAP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserRequest {
    /// Checks the "preferred username, or both names" invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            || (self.first_name.as_deref().is_some_and(|s| !s.is_empty())
                && self.last_name.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// A provisioned POSIX account, returned from `POST /user`.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Login name. Matches `[a-z][a-z0-9]{2,15}`.
    pub user: String,
    /// Numeric uid. Equal to `gid` for a primary-user account.
    pub uid: u32,
    /// Numeric gid of the primary group.
    pub gid: u32,
    /// Freshly generated 32-character password; only ever returned once.
    pub password: String,
    /// Resolved home directory path (`HOME_TEMPLATE` expanded with `user`).
    pub home: String,
}

/// A POSIX group, returned from `POST /group/<name>`.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    /// Group name.
    pub name: String,
    /// Numeric gid.
    pub gid: u32,
    /// Resolved member login names.
    pub members: Vec<String>,
}

/// The Kerberos-side counterpart of an [`Account`].
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    /// Principal name; equals the account's login name.
    pub name: String,
    /// Whether the principal requires pre-authentication.
    pub requires_preauth: bool,
    /// Whether the principal may act as a server (ticket-granting target).
    pub allow_svr: bool,
    /// Optional expiry timestamp string, as accepted by `kadmin`.
    pub expire: Option<String>,
}

impl Default for PrincipalRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            requires_preauth: true,
            allow_svr: false,
            expire: None,
        }
    }
}

/// Opaque proof-of-intent token issued by the home-directory service on the
/// first `DELETE /user/<name>` call.
///
/// The token is a bearer string from the orchestrator's point of view; only
/// `usermgr-homedir` knows how to mint and validate one (see Open Question
/// (a) in `DESIGN.md`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteToken(pub String);

impl std::fmt::Display for DeleteToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_request_valid_with_username_only() {
        let r = UserRequest {
            username: Some("jdoe".into()),
            ..Default::default()
        };
        assert!(r.is_valid());
    }

    #[test]
    fn user_request_valid_with_both_names() {
        let r = UserRequest {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..Default::default()
        };
        assert!(r.is_valid());
    }

    #[test]
    fn user_request_invalid_with_only_first_name() {
        let r = UserRequest {
            first_name: Some("Jane".into()),
            ..Default::default()
        };
        assert!(!r.is_valid());
    }

    #[test]
    fn user_request_invalid_empty() {
        assert!(!UserRequest::default().is_valid());
    }

    #[test]
    fn principal_record_default_requires_preauth() {
        let p = PrincipalRecord::default();
        assert!(p.requires_preauth);
        assert!(!p.allow_svr);
    }
}
