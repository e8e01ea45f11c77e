//! `usermgrd`: the HTTP surface for the usermgr provisioning orchestrator.
//!
//! Bootstraps configuration, the shared [`AppContext`], and a UNIX-domain
//! socket listener; every accepted connection gets its own SPNEGO
//! [`ConnectionContext`], since a GSSAPI context lives as long as the
//! connection, not the request — grounded on `clumsy/cli.py`'s raw socket
//! bind/chown/chmod bootstrap.

mod error;
mod routes;

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use axum::extract::Extension;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HyperBuilder;
use tokio::net::UnixListener;
use tower::Service;

use usermgr_auth::SpnegoAcceptor;
use usermgr_core::{AppContext, HostNameService};
use usermgr_types::config::SocketConfig;
use usermgr_types::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn bind_socket(cfg: &SocketConfig) -> Result<UnixListener, BoxError> {
    if cfg.path.exists() {
        std::fs::remove_file(&cfg.path)?;
    }
    let listener = UnixListener::bind(&cfg.path)?;
    let uid = nix::unistd::User::from_name(&cfg.user)?.map(|u| u.uid);
    let gid = nix::unistd::Group::from_name(&cfg.group)?.map(|g| g.gid);
    nix::unistd::chown(&cfg.path, uid, gid)?;
    std::fs::set_permissions(&cfg.path, std::fs::Permissions::from_mode(cfg.mode))?;
    Ok(listener)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let acceptor = Arc::new(SpnegoAcceptor::new(format!(
        "{}@{}",
        "usermgr",
        hostname_or_localhost()
    )));

    let nameservice = Arc::new(HostNameService);
    let ctx = AppContext::new(config.clone(), nameservice);
    let app = routes::router(ctx);

    let listener = bind_socket(&config.socket)?;
    tracing::info!(socket = %config.socket.path.display(), "usermgrd listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let app = app.clone();
        let acceptor = Arc::clone(&acceptor);

        tokio::spawn(async move {
            let conn_ctx: usermgr_auth::ConnectionContext = Arc::new(std::sync::Mutex::new(None));
            // Extension must run before the SPNEGO middleware so the latter
            // can see the per-connection GSSAPI slot; `Router::layer` makes
            // the most recently added layer outermost, so it's added last.
            let service = app
                .layer(axum::middleware::from_fn_with_state(
                    acceptor,
                    usermgr_auth::spnego_middleware,
                ))
                .layer(Extension(conn_ctx));
            let io = TokioIo::new(stream);
            let hyper_service = hyper::service::service_fn(move |request| {
                let mut service = service.clone();
                async move { service.call(request).await }
            });
            if let Err(err) = HyperBuilder::new(TokioExecutor::new())
                .serve_connection(io, hyper_service)
                .await
            {
                tracing::warn!(error = %err, "connection error");
            }
        });
    }
}

fn hostname_or_localhost() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
