//! The closed set of client-visible error kinds.
//!
//! Every kind carries its own HTTP status code and machine-readable
//! `status` string, so classification (`http_status`/`status_str`) lives
//! on the error itself rather than being re-derived at each call site.

use serde::Serialize;
use thiserror::Error;

/// A client-visible error kind.
///
/// `Display` yields the exact `status` string sent to clients; use
/// [`ErrorKind::http_status`] for the HTTP status code and
/// [`ErrorKind::to_body`] for the full JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Target user does not resolve via the name service.
    #[error("user_not_found")]
    UserNotFound,
    /// LDAP `add` of the user entry hit an existing DN.
    #[error("user_exists")]
    UserExists,
    /// LDAP `add` of the primary group entry hit an existing DN.
    #[error("group_exists")]
    GroupExists,
    /// Caller is not authorized to perform this operation.
    #[error("unauthorized")]
    Unauthorized,
    /// Target user is not a member of the target group (add-member path,
    /// where the *caller* is the one required to already be a member).
    #[error("not_a_member")]
    NotAMember,
    /// `memberUid` removal found the member already absent (remove-member
    /// path). Same `status` string as [`Self::NotAMember`] but a distinct
    /// kind because the two call sites disagree on HTTP status: add-member
    /// treats this as the caller's authorization failing (403), remove-member
    /// treats it as the target resource not existing (404).
    #[error("not_a_member")]
    NotAMemberRemove,
    /// Target group is someone's primary group and cannot be deleted.
    #[error("primary_group")]
    PrimaryGroup,
    /// `kadmin` add/get/delete principal failed.
    #[error("kerberos_failed")]
    KerberosFailed,
    /// Could not open a connection to the home-directory service.
    #[error("mkhomedird_connect")]
    MkhomedirConnect,
    /// Home-directory service reported a non-`ok` status on create/delete.
    #[error("mkhomedir_failed")]
    MkhomedirFailed,
    /// Home-directory service failed to revoke a group's leftover ACLs.
    #[error("mkhomedir_group_delete")]
    MkhomedirGroupDelete,
    /// Could not open a connection to the cache-flush service.
    #[error("nscdflushd_connect")]
    NscdflushdConnect,
    /// Cache-flush service reported a non-`ok` status.
    #[error("flush_failed")]
    FlushFailed,
    /// Dual-direction name-service resolution disagreed after consistency wait.
    #[error("user_mismatch")]
    UserMismatch,
    /// Consistency wait exhausted its 60 retries without resolution.
    #[error("user_add_failed")]
    UserAddFailed,
    /// Consistency wait (group/member variant) exhausted its retries.
    #[error("resolve_timeout")]
    ResolveTimeout,
    /// Numeric uid allocator exhausted its candidate draws.
    #[error("uid")]
    Uid,
    /// Numeric gid allocator exhausted its candidate draws.
    #[error("gid")]
    Gid,
    /// Login-name allocator exhausted its candidate sequence.
    #[error("username")]
    Username,
    /// Group-name allocator exhausted its candidate sequence.
    #[error("groupname")]
    Groupname,
    /// Delete-token does not match the user who requested it.
    #[error("token_invalid")]
    TokenInvalid,
    /// Delete-token was presented after its 60-second expiry.
    #[error("token_expired")]
    TokenExpired,
    /// Same create/delete is already running for this user (in-flight guard).
    #[error("in_progress")]
    InProgress,
    /// Home-directory already exists at the target path.
    #[error("homedir_exists")]
    HomedirExists,
    /// Skeleton directory copy failed.
    #[error("copy_skeleton_failed")]
    CopySkeletonFailed,
    /// Gid given to the homedir service's group-delete endpoint is not numeric.
    #[error("invalid_gid")]
    InvalidGid,
    /// `sss_cache` exited non-zero.
    #[error("sss_failed")]
    SssFailed,
    /// `nscd` exited non-zero.
    #[error("nscd_failed")]
    NscdFailed,
    /// Catch-all for anything not already classified; never silently swallowed.
    #[error("bug")]
    Bug,
}

impl ErrorKind {
    /// The HTTP status code this kind is reported with.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::UserNotFound | Self::NotAMemberRemove => 404,
            Self::Unauthorized
            | Self::NotAMember
            | Self::PrimaryGroup
            | Self::TokenInvalid
            | Self::TokenExpired => 403,
            Self::InProgress => 202,
            Self::UserExists
            | Self::GroupExists
            | Self::KerberosFailed
            | Self::MkhomedirConnect
            | Self::MkhomedirFailed
            | Self::MkhomedirGroupDelete
            | Self::NscdflushdConnect
            | Self::FlushFailed
            | Self::UserMismatch
            | Self::UserAddFailed
            | Self::ResolveTimeout
            | Self::Uid
            | Self::Gid
            | Self::Username
            | Self::Groupname
            | Self::HomedirExists
            | Self::CopySkeletonFailed
            | Self::InvalidGid
            | Self::SssFailed
            | Self::NscdFailed
            | Self::Bug => 500,
        }
    }

    /// The machine-readable `status` string (identical to `Display`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::UserExists => "user_exists",
            Self::GroupExists => "group_exists",
            Self::Unauthorized => "unauthorized",
            Self::NotAMember | Self::NotAMemberRemove => "not_a_member",
            Self::PrimaryGroup => "primary_group",
            Self::KerberosFailed => "kerberos_failed",
            Self::MkhomedirConnect => "mkhomedird_connect",
            Self::MkhomedirFailed => "mkhomedir_failed",
            Self::MkhomedirGroupDelete => "mkhomedir_group_delete",
            Self::NscdflushdConnect => "nscdflushd_connect",
            Self::FlushFailed => "flush_failed",
            Self::UserMismatch => "user_mismatch",
            Self::UserAddFailed => "user_add_failed",
            Self::ResolveTimeout => "resolve_timeout",
            Self::Uid => "uid",
            Self::Gid => "gid",
            Self::Username => "username",
            Self::Groupname => "groupname",
            Self::TokenInvalid => "token_invalid",
            Self::TokenExpired => "token_expired",
            Self::InProgress => "in_progress",
            Self::HomedirExists => "homedir_exists",
            Self::CopySkeletonFailed => "copy_skeleton_failed",
            Self::InvalidGid => "invalid_gid",
            Self::SssFailed => "sss_failed",
            Self::NscdFailed => "nscd_failed",
            Self::Bug => "bug",
        }
    }

    /// Whether a create path may be safely retried without first re-reading
    /// state.
    #[must_use]
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::UserNotFound | Self::NotAMember | Self::NotAMemberRemove | Self::TokenExpired
        )
    }

    /// Turn this kind into the JSON body clients receive.
    #[must_use]
    pub fn to_body(self) -> ErrorBody {
        ErrorBody {
            status: self.as_str(),
        }
    }
}

/// The `{"status": "..."}` JSON body every error response carries.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable status string, one of [`ErrorKind::as_str`]'s outputs.
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec() {
        assert_eq!(ErrorKind::UserNotFound.http_status(), 404);
        assert_eq!(ErrorKind::UserExists.http_status(), 500);
        assert_eq!(ErrorKind::Unauthorized.http_status(), 403);
        assert_eq!(ErrorKind::InProgress.http_status(), 202);
        assert_eq!(ErrorKind::Bug.http_status(), 500);
        assert_eq!(ErrorKind::NotAMember.http_status(), 403);
        assert_eq!(ErrorKind::NotAMemberRemove.http_status(), 404);
        assert_eq!(ErrorKind::NotAMemberRemove.as_str(), "not_a_member");
    }

    #[test]
    fn display_matches_as_str() {
        for kind in [ErrorKind::UserMismatch, ErrorKind::Groupname, ErrorKind::Bug] {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn serializes_to_status_body() {
        let body = ErrorKind::NotAMember.to_body();
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"status":"not_a_member"}"#);
    }

    #[test]
    fn create_paths_are_not_retriable() {
        assert!(!ErrorKind::UserExists.is_retriable());
        assert!(ErrorKind::UserNotFound.is_retriable());
    }
}
