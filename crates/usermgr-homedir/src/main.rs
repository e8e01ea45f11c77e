//! `mkhomedird`: the home-directory creation/deletion satellite daemon
//!, grounded on `clumsy/mkhomedird.py`. Needs `CAP_CHOWN` and a
//! local `rsync`/`setfacl` to do its work; trusts any caller that can reach
//! its UNIX-domain socket, the same boundary the Python blueprint assumes.

mod ops;
mod state;

use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};

use usermgr_core::HostNameService;
use usermgr_types::config::CreatePolicy;
use usermgr_types::Config;

use state::{AppState, TOKEN_TTL};

const DIR_MODE: u32 = 0o750;

fn json(status: StatusCode, body: serde_json::Value) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(body))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(_guard) = state.try_start(&user) else {
        tracing::warn!(%user, "create_home_in_progress");
        return json(StatusCode::ACCEPTED, serde_json::json!({"status": "in_progress"}));
    };

    tracing::info!(%user, "create_home_start");

    let Some(uid) = state.nameservice.uid_of_user(&user) else {
        tracing::warn!(%user, "create_home_user_not_found");
        return json(StatusCode::NOT_FOUND, serde_json::json!({"status": "user_not_found"}));
    };
    let gid = state
        .nameservice
        .primary_gid_of_user(&user)
        .unwrap_or(uid);

    for rule in &state.config.directories {
        if !rule.create.creates() {
            continue;
        }
        let dir = ops::expand_template(&rule.path_template, &user, uid, gid);
        let path = PathBuf::from(&dir);

        tracing::info!(%user, directory = %dir, "create_home_mkdir");
        if let Err(err) = std::fs::DirBuilder::new().mode(DIR_MODE).create(&path) {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                tracing::warn!(%user, directory = %dir, "create_home_mkdir_exists");
                return json(StatusCode::CONFLICT, serde_json::json!({"status": "homedir_exists"}));
            }
            tracing::error!(%user, directory = %dir, error = %err, "create_home_mkdir_failed");
            return json(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"status": "mkdir_failed"}),
            );
        }
        if let Err(err) = nix::unistd::chown(
            &path,
            Some(nix::unistd::Uid::from_raw(uid)),
            Some(nix::unistd::Gid::from_raw(gid)),
        ) {
            tracing::error!(%user, directory = %dir, error = %err, "create_home_chown_failed");
            return json(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"status": "mkdir_failed"}),
            );
        }

        if let CreatePolicy::Skeleton(skel) = &rule.create {
            match ops::copy_skeleton(skel, &path, uid, gid).await {
                Ok(true) => {}
                Ok(false) | Err(_) => {
                    tracing::error!(%user, directory = %dir, "create_home_copy_skel_failed");
                    return json(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        serde_json::json!({"status": "copy_skeleton_failed"}),
                    );
                }
            }
            // rsync's `--chown` only affects the entries it transfers, not
            // the destination's own mode bit it may have altered.
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(DIR_MODE));
        }
    }

    tracing::info!(%user, "create_home_success");
    json(StatusCode::CREATED, serde_json::json!({"status": "ok"}))
}

#[derive(serde::Deserialize)]
struct DeleteQuery {
    token: Option<String>,
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(token) = query.token else {
        let Some(uid) = state.nameservice.uid_of_user(&user) else {
            tracing::warn!(%user, "delete_home_user_not_found");
            return json(StatusCode::NOT_FOUND, serde_json::json!({"status": "user_not_found"}));
        };
        let gid = state.nameservice.primary_gid_of_user(&user).unwrap_or(uid);
        let token = state.issue_token(&user, uid, gid);
        tracing::info!(%user, "delete_home_again");
        return json(
            StatusCode::OK,
            serde_json::json!({"status": "again", "token": token}),
        );
    };

    let Some(record) = state.take_token(&token, &user) else {
        tracing::warn!(%user, "delete_home_token_invalid");
        return json(StatusCode::FORBIDDEN, serde_json::json!({"status": "token_invalid"}));
    };
    if record.issued_at.elapsed() > TOKEN_TTL {
        tracing::warn!(%user, "delete_home_token_expired");
        return json(StatusCode::FORBIDDEN, serde_json::json!({"status": "token_expired"}));
    }
    if state.nameservice.uid_of_user(&user).is_some() {
        tracing::error!(%user, "delete_home_user_exists");
        return json(StatusCode::FORBIDDEN, serde_json::json!({"status": "user_exists"}));
    }

    for rule in &state.config.directories {
        if !rule.delete {
            continue;
        }
        let dir = ops::expand_template(&rule.path_template, &user, record.uid, record.gid);
        let path = PathBuf::from(&dir);
        if path.exists() {
            tracing::info!(%user, directory = %dir, "delete_home_rmdir");
            if let Err(err) = std::fs::remove_dir_all(&path) {
                tracing::error!(%user, directory = %dir, error = %err, "delete_home_rmdir_failed");
            }
        }
    }

    let group_dirs: Vec<String> = state
        .config
        .directories
        .iter()
        .filter(|r| r.delete_group)
        .map(|r| r.path_template.clone())
        .collect();
    ops::revoke_acl(&group_dirs, &[record.uid], &[record.gid]).await;

    tracing::info!(%user, "delete_home_success");
    json(StatusCode::OK, serde_json::json!({"status": "ok"}))
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(gids): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let parsed: Result<Vec<u32>, _> = gids.split(',').map(str::parse::<u32>).collect();
    let Ok(gids) = parsed else {
        tracing::warn!(%gids, "delete_group_invalid_gids");
        return json(StatusCode::BAD_REQUEST, serde_json::json!({"status": "invalid_gid"}));
    };

    let dirs: Vec<String> = state
        .config
        .directories
        .iter()
        .filter(|r| r.delete_group)
        .map(|r| r.path_template.clone())
        .collect();
    ops::revoke_acl(&dirs, &[], &gids).await;

    tracing::info!(?gids, "delete_group_success");
    json(StatusCode::OK, serde_json::json!({"status": "ok"}))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let socket = config.socket.clone();
    let state = Arc::new(AppState::new(config, Arc::new(HostNameService)));
    let app = router(state);

    if socket.path.exists() {
        std::fs::remove_file(&socket.path)?;
    }
    let listener = tokio::net::UnixListener::bind(&socket.path)?;
    let uid = nix::unistd::User::from_name(&socket.user)?.map(|u| u.uid);
    let gid = nix::unistd::Group::from_name(&socket.group)?.map(|g| g.gid);
    nix::unistd::chown(&socket.path, uid, gid)?;
    std::fs::set_permissions(&socket.path, std::fs::Permissions::from_mode(socket.mode))?;

    tracing::info!(socket = %socket.path.display(), "mkhomedird listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user/{user}", post(create_user).delete(delete_user))
        .route("/group/{gids}", delete(delete_group))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use usermgr_types::config::{AllocationConfig, DirectoryRule, KerberosConfig, LdapConfig, SiblingsConfig, SocketConfig};
    use usermgr_testing::FakeNameService;

    fn test_config(directories: Vec<DirectoryRule>) -> Config {
        Config {
            socket: SocketConfig {
                path: "/tmp/unused.sock".into(),
                user: "root".into(),
                group: "root".into(),
                mode: 0o660,
            },
            allocation: AllocationConfig {
                min_uid: 1000,
                max_uid: 2000,
                min_gid: 1000,
                max_gid: 2000,
            },
            ldap: LdapConfig {
                server: "ldap://unused".into(),
                user: "cn=unused".into(),
                password: "unused".into(),
                base_people: "ou=people".into(),
                base_group: "ou=group".into(),
                extra_classes: vec![],
            },
            kerberos: KerberosConfig {
                user: "unused".into(),
                keytab: "/unused".into(),
                expire: None,
            },
            siblings: SiblingsConfig {
                nscdflushd_socket: "/unused".into(),
                mkhomedird_socket: "/unused".into(),
            },
            home_template: "/home/{user}".into(),
            authorization_create: "admin".into(),
            synthesize_names_from_uid: true,
            directories,
        }
    }

    #[tokio::test]
    async fn create_user_rejects_unknown_principal() {
        let home = tempfile::tempdir().unwrap();
        let config = test_config(vec![DirectoryRule {
            path_template: format!("{}/{{user}}", home.path().display()),
            create: usermgr_types::config::CreatePolicy::Bool(true),
            delete: true,
            delete_group: false,
        }]);
        let nameservice = Arc::new(FakeNameService::new());
        let state = Arc::new(AppState::new(config, nameservice));
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/user/jdoe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_user_creates_homedir_for_known_principal() {
        let home = tempfile::tempdir().unwrap();
        let target = home.path().join("jdoe");
        let config = test_config(vec![DirectoryRule {
            path_template: target.to_string_lossy().into_owned(),
            create: usermgr_types::config::CreatePolicy::Bool(true),
            delete: true,
            delete_group: false,
        }]);
        let nameservice = Arc::new(FakeNameService::new());
        nameservice.insert_user("jdoe", 1500, 1500);
        let state = Arc::new(AppState::new(config, nameservice));
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/user/jdoe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn delete_user_issues_then_honors_a_token() {
        let config = test_config(vec![]);
        let nameservice = Arc::new(FakeNameService::new());
        nameservice.insert_user("jdoe", 1500, 1500);
        let state = Arc::new(AppState::new(config, nameservice.clone()));
        let app = router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/user/jdoe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "again");
        let token = body["token"].as_str().unwrap().to_string();

        // User still resolves: the second call must refuse.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/user/jdoe?token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        nameservice.remove_user("jdoe");
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/user/jdoe?token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
