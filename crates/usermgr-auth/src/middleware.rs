//! axum middleware implementing the SPNEGO authenticator,
//! adapted from `clumsy/gssapi/server.py`'s `authorized` decorator.

use std::sync::Arc;

use axum::{
    extract::{Extension, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;

use crate::acceptor::{ConnectionContext, SpnegoAcceptor};
use usermgr_types::ErrorKind;

/// The authenticated caller's principal name, inserted into request
/// extensions once a context completes. `name` is the GSSAPI initiator
/// name's string form, e.g. `jdoe@EXAMPLE.ORG`; handlers that need only the
/// local part split on `@`.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub String);

impl AuthenticatedPrincipal {
    /// The local part of the principal, before the first `@`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }
}

const B64: base64::engine::general_purpose::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Wraps a handler with SPNEGO authentication.
///
/// On each request: if the connection has no context yet, one is created
/// from the configured service credential. If an `Authorization: Negotiate
/// <b64>` header is present, the context is stepped with the decoded
/// token; a failed step destroys the context so the next request starts
/// fresh. A completed context invokes the wrapped handler with
/// [`AuthenticatedPrincipal`] available via request extensions, echoing any
/// outbound token in `WWW-Authenticate`. An incomplete context answers 401
/// with `WWW-Authenticate: Negotiate[ <b64>]` and no body authentication of
/// any kind — caller identity only.
pub async fn spnego_middleware(
    State(acceptor): State<Arc<SpnegoAcceptor>>,
    Extension(conn_ctx): Extension<ConnectionContext>,
    mut req: Request,
    next: Next,
) -> Response {
    {
        let mut guard = conn_ctx.lock().expect("connection context mutex poisoned");
        if guard.is_none() {
            match acceptor.new_context() {
                Ok(ctx) => *guard = Some(ctx),
                Err(e) => {
                    tracing::error!(error = %e, "failed to acquire GSSAPI server credential");
                    return bug_response();
                }
            }
        }
    }

    let incoming_token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Negotiate "))
        .map(str::to_string);

    let Some(token) = incoming_token else {
        return unauthorized_response(None);
    };

    let decoded = match B64.decode(token) {
        Ok(d) => d,
        Err(e) => {
            tracing::debug!(error = %e, "malformed base64 in Negotiate header");
            return unauthorized_response(None);
        }
    };

    let step_result = {
        let mut guard = conn_ctx.lock().expect("connection context mutex poisoned");
        let ctx = guard.as_mut().expect("context created above");
        ctx.step(Some(&decoded), None)
    };

    match step_result {
        Err(e) => {
            tracing::warn!(error = %e, "GSSAPI step failed, resetting context");
            *conn_ctx.lock().expect("connection context mutex poisoned") = None;
            unauthorized_response(None)
        }
        Ok(out_token) => {
            let guard = conn_ctx.lock().expect("connection context mutex poisoned");
            let ctx = guard.as_ref().expect("context created above");
            if ctx.is_complete() {
                let principal = match ctx.source_name() {
                    Ok(name) => name.to_string(),
                    Err(e) => {
                        tracing::error!(error = %e, "completed context has no initiator name");
                        drop(guard);
                        return bug_response();
                    }
                };
                drop(guard);
                req.extensions_mut()
                    .insert(AuthenticatedPrincipal(principal));
                let mut response = next.run(req).await;
                if let Some(tok) = out_token {
                    if let Ok(value) = header::HeaderValue::from_str(&format!(
                        "Negotiate {}",
                        B64.encode(tok.as_ref())
                    )) {
                        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                    }
                }
                response
            } else {
                drop(guard);
                let challenge = out_token.map(|tok| format!("Negotiate {}", B64.encode(tok.as_ref())));
                unauthorized_response(challenge)
            }
        }
    }
}

fn unauthorized_response(challenge: Option<String>) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorKind::Unauthorized.to_body()),
    )
        .into_response();
    let value = challenge.unwrap_or_else(|| "Negotiate".to_string());
    if let Ok(header_value) = header::HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, header_value);
    }
    response
}

fn bug_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorKind::Bug.to_body())).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn local_name_splits_on_at() {
        let p = AuthenticatedPrincipal("jdoe@EXAMPLE.ORG".to_string());
        assert_eq!(p.local_name(), "jdoe");
    }

    #[test]
    fn local_name_without_realm_is_whole_string() {
        let p = AuthenticatedPrincipal("jdoe".to_string());
        assert_eq!(p.local_name(), "jdoe");
    }
}
