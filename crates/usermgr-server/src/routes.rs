//! Routes the five orchestrator operations over the UNIX-domain socket
//!, each wrapped by [`usermgr_auth::spnego_middleware`].

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};

use usermgr_auth::AuthenticatedPrincipal;
use usermgr_core::{handlers, AppContext};
use usermgr_types::model::UserRequest;

use crate::error::ApiError;

/// Build the unauthenticated router; the caller wraps it with
/// [`usermgr_auth::spnego_middleware`] and the per-connection
/// [`usermgr_auth::ConnectionContext`] extension: the GSSAPI context is
/// scoped to the connection, not the request.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/user", post(create_user).delete(delete_user))
        .route("/group/{name}", post(create_group))
        .route("/group/{group}/{user}", post(add_member))
        .route("/group/{group}", delete(remove_member))
        .with_state(ctx)
}

async fn create_user(
    State(ctx): State<AppContext>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let account = handlers::create_user(&ctx, principal.local_name(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "ok",
            "user": account.user,
            "password": account.password,
            "uid": account.uid,
            "gid": account.gid,
        })),
    ))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = principal.local_name();
    handlers::delete_user(&ctx, user, user).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

async fn create_group(
    State(ctx): State<AppContext>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let group = handlers::create_group(&ctx, principal.local_name(), &name).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "ok",
            "group": group.name,
            "gid": group.gid,
            "members": group.members,
        })),
    ))
}

async fn add_member(
    State(ctx): State<AppContext>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path((group, user)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    handlers::add_member(&ctx, principal.local_name(), &group, &user).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

async fn remove_member(
    State(ctx): State<AppContext>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(group): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let member = principal.local_name();
    handlers::remove_member(&ctx, member, &group, member).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}
