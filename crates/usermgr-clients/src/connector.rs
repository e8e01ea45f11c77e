//! A `tower::Service<Uri>` connector that dials a fixed UNIX-domain socket
//! path regardless of the request URI's host, the Rust-ecosystem shape of
//! `aiohttp.UnixConnector` used by `clumsy/usermgrd.py`'s `socketSession`.
//!
//! Hand-rolled rather than built on `hyperlocal`, to keep this crate's
//! dependency on the `hyper` 1.x API surface limited to what the
//! `hyper-util`/`http-body-util` documentation shows directly (see
//! DESIGN.md).

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tower::Service;

/// Connects every request to the same UNIX-domain socket path.
#[derive(Clone)]
pub(crate) struct UnixConnector {
    path: Arc<PathBuf>,
}

impl UnixConnector {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }
}

impl Service<Uri> for UnixConnector {
    type Response = TokioIo<UnixStream>;
    type Error = std::io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: Uri) -> Self::Future {
        let path = Arc::clone(&self.path);
        Box::pin(async move {
            let stream = UnixStream::connect(path.as_path()).await?;
            Ok(TokioIo::new(stream))
        })
    }
}
