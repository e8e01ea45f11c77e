//! Client for the NSS cache-flush sibling daemon (`clumsy/nscdflushd.py`).

use std::path::PathBuf;

use hyper::Method;

use crate::base::SiblingClient;
use crate::error::SiblingError;
use crate::response::CacheFlushResponse;

/// Talks to `nscdflushd`'s single flush endpoint.
#[derive(Clone)]
pub struct CacheFlushClient {
    client: SiblingClient,
}

impl CacheFlushClient {
    /// Build a client dialing the configured `NSCDFLUSHD_SOCKET`.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            client: SiblingClient::new(socket_path),
        }
    }

    /// `DELETE /account`.
    pub async fn flush(&self) -> Result<CacheFlushResponse, SiblingError> {
        self.client.call(Method::DELETE, "/account").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client() {
        let _ = CacheFlushClient::new("/run/usermgr/nscdflushd.sock");
    }
}
