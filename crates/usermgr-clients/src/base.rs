//! Shared request plumbing for the sibling-daemon clients.

use std::path::PathBuf;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;

use crate::connector::UnixConnector;
use crate::error::SiblingError;

/// A cheap-to-clone HTTP client bound to one UNIX-domain socket path.
///
/// Created once at startup (per §5's "two HTTP sessions to local sockets,
/// all created at startup") and shared across concurrently handled
/// requests — `hyper_util`'s legacy client is `Clone` and safe to use from
/// many tasks at once, matching `aiohttp.ClientSession`'s sharing model.
#[derive(Clone)]
pub struct SiblingClient {
    inner: LegacyClient<UnixConnector, Full<Bytes>>,
}

impl SiblingClient {
    /// Build a client dialing `socket_path` on every request.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        let connector = UnixConnector::new(socket_path.into());
        let inner = LegacyClient::builder(TokioExecutor::new()).build(connector);
        Self { inner }
    }

    /// Issue a request with no body and deserialize the JSON response.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<T, SiblingError> {
        let uri: Uri = format!("http://localhost{path_and_query}")
            .parse()
            .map_err(|e| SiblingError::Malformed(format!("invalid path {path_and_query}: {e}")))?;

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .map_err(|e| SiblingError::Malformed(e.to_string()))?;

        let response = self
            .inner
            .request(request)
            .await
            .map_err(|e| SiblingError::Transport(e.to_string()))?;

        // The wire contract always carries a JSON `status`
        // field, including on non-2xx responses (`in_progress`,
        // `homedir_exists`, `token_invalid`, ...), so the caller — not this
        // layer — interprets the body's `status` string.
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SiblingError::Transport(e.to_string()))?
            .to_bytes();

        serde_json::from_slice(&body)
            .map_err(|e| SiblingError::Malformed(format!("{e}: {}", String::from_utf8_lossy(&body))))
    }
}
