//! Scripted HTTP-over-UNIX-domain-socket mock server, standing in for
//! `mkhomedird`/`nscdflushd` in tests of [`usermgr_clients::HomedirClient`]
//! and [`usermgr_clients::CacheFlushClient`].
//!
//! A builder queues scripted JSON responses, then `serve`s them one per
//! accepted connection on a UNIX-domain socket.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// Errors building or driving a [`MockSiblingServer`].
#[derive(Debug, Error)]
pub enum MockServerError {
    /// Could not create the temporary directory the socket lives in.
    #[error("failed to create temp dir: {0}")]
    TempDir(std::io::Error),
    /// Could not bind the UNIX-domain socket.
    #[error("failed to bind unix socket: {0}")]
    Bind(std::io::Error),
}

type Queue = VecDeque<(StatusCode, serde_json::Value)>;

#[derive(Default)]
struct Scripted {
    responses: HashMap<(Method, String), Queue>,
}

/// Builds a [`MockSiblingServer`] with pre-scripted responses.
#[derive(Default)]
pub struct MockServerBuilder {
    scripted: Scripted,
}

impl MockServerBuilder {
    /// Queue `body` (with status 200) as the next response to `method
    /// path`. Calling this more than once for the same `(method, path)`
    /// queues successive responses, popped oldest-first — useful for
    /// scripting the homedir delete-token handshake's two distinct calls
    /// to the same path.
    #[must_use]
    pub fn with_response(mut self, method: Method, path: impl Into<String>, body: serde_json::Value) -> Self {
        self.scripted
            .responses
            .entry((method, path.into()))
            .or_default()
            .push_back((StatusCode::OK, body));
        self
    }

    /// Queue a response with an explicit, non-200 HTTP status.
    #[must_use]
    pub fn with_status_response(
        mut self,
        method: Method,
        path: impl Into<String>,
        status: StatusCode,
        body: serde_json::Value,
    ) -> Self {
        self.scripted
            .responses
            .entry((method, path.into()))
            .or_default()
            .push_back((status, body));
        self
    }

    /// Bind the UNIX-domain socket and start serving in a background task.
    pub async fn build(self) -> Result<MockSiblingServer, MockServerError> {
        let dir = TempDir::new().map_err(MockServerError::TempDir)?;
        let socket_path = dir.path().join("mock.sock");

        let listener = UnixListener::bind(&socket_path).map_err(MockServerError::Bind)?;
        let state = Arc::new(Mutex::new(self.scripted));

        let app = Router::new().fallback(any(handle)).with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(MockSiblingServer {
            _dir: dir,
            socket_path,
            task,
        })
    }
}

async fn handle(
    State(state): State<Arc<Mutex<Scripted>>>,
    method: Method,
    uri: axum::http::Uri,
    _body: Bytes,
) -> impl IntoResponse {
    let key = (
        method,
        uri.path_and_query().map_or_else(|| uri.path().to_string(), ToString::to_string),
    );
    let next = state.lock().responses.get_mut(&key).and_then(VecDeque::pop_front);
    match next {
        Some((status, body)) => (status, axum::Json(body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({"status": "bug", "detail": "no scripted response queued"})),
        )
            .into_response(),
    }
}

/// A running mock sibling daemon, bound to a temporary UNIX-domain socket.
///
/// Dropping this stops the background server task (the listening socket's
/// backing directory is also removed).
pub struct MockSiblingServer {
    _dir: TempDir,
    socket_path: PathBuf,
    task: JoinHandle<()>,
}

impl MockSiblingServer {
    /// A fresh builder with no scripted responses.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    /// The socket path a client should dial, e.g. passed straight into
    /// `HomedirClient::new`/`CacheFlushClient::new`.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for MockSiblingServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usermgr_clients::{CacheFlushClient, HomedirClient};

    #[tokio::test]
    async fn scripted_homedir_create_response_round_trips() {
        let server = MockSiblingServer::builder()
            .with_response(Method::POST, "/user/jdoe", serde_json::json!({"status": "ok"}))
            .build()
            .await
            .unwrap();

        let client = HomedirClient::new(server.socket_path());
        let resp = client.create_user("jdoe").await.unwrap();
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order() {
        let server = MockSiblingServer::builder()
            .with_response(
                Method::DELETE,
                "/user/jdoe",
                serde_json::json!({"status": "again", "token": "tok-1"}),
            )
            .with_response(Method::DELETE, "/user/jdoe?token=tok-1", serde_json::json!({"status": "ok"}))
            .build()
            .await
            .unwrap();

        let client = HomedirClient::new(server.socket_path());
        let first = client.request_delete_token("jdoe").await.unwrap();
        assert_eq!(first.status, "again");
        assert_eq!(first.token.as_deref(), Some("tok-1"));

        let second = client.delete_user("jdoe", "tok-1").await.unwrap();
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn unscripted_path_reports_bug() {
        let server = MockSiblingServer::builder().build().await.unwrap();
        let client = CacheFlushClient::new(server.socket_path());
        let err = client.flush().await;
        // The handler still returns valid JSON (status "bug"), which is a
        // successful HTTP call from the client's point of view; the
        // scripting gap is a test-authoring error, not a transport one.
        assert!(err.is_ok());
    }
}
