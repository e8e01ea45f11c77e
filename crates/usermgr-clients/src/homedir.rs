//! Client for the home-directory sibling daemon (`clumsy/mkhomedird.py`).

use std::path::PathBuf;

use hyper::Method;

use crate::base::SiblingClient;
use crate::error::SiblingError;
use crate::response::HomedirResponse;

/// Talks to `mkhomedird`'s create/delete/group-delete endpoints.
#[derive(Clone)]
pub struct HomedirClient {
    client: SiblingClient,
}

impl HomedirClient {
    /// Build a client dialing the configured `MKHOMEDIRD_SOCKET`.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            client: SiblingClient::new(socket_path),
        }
    }

    /// `POST /user/<name>`.
    pub async fn create_user(&self, name: &str) -> Result<HomedirResponse, SiblingError> {
        self.client
            .call(Method::POST, &format!("/user/{name}"))
            .await
    }

    /// First-phase `DELETE /user/<name>` (no token): reserves intent and
    /// returns a proof-of-possession token.
    pub async fn request_delete_token(&self, name: &str) -> Result<HomedirResponse, SiblingError> {
        self.client
            .call(Method::DELETE, &format!("/user/{name}"))
            .await
    }

    /// Second-phase `DELETE /user/<name>?token=<t>`: the irreversible action.
    pub async fn delete_user(&self, name: &str, token: &str) -> Result<HomedirResponse, SiblingError> {
        self.client
            .call(Method::DELETE, &format!("/user/{name}?token={token}"))
            .await
    }

    /// `DELETE /group/<gid>[,<gid>...]`, revoking leftover ACLs for each
    /// garbage-collected group.
    pub async fn delete_group(&self, gids: &[u32]) -> Result<HomedirResponse, SiblingError> {
        let joined = gids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.client
            .call(Method::DELETE, &format!("/group/{joined}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client() {
        let _ = HomedirClient::new("/run/usermgr/mkhomedird.sock");
    }
}
