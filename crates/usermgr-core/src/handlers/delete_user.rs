//! Delete-user orchestration.
//!
//! Steps 3-7 are deliberately *not* rolled back: once Kerberos has
//! disabled the account, forward progress is the only safe direction, and
//! every external call tolerates "already done" so the operation is safe
//! to retry.

use ldap3::Scope;

use usermgr_directory::{escape_filter_value, DirectoryError};
use usermgr_types::error::ErrorKind;

use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};
use crate::handlers::gc::garbage_collect_groups;

/// `DELETE /user/<name>`: the caller must be the target account itself.
#[tracing::instrument(skip(ctx, principal))]
pub async fn delete_user(ctx: &AppContext, principal: &str, user: &str) -> Result<()> {
    if principal != user {
        return Err(OrchestratorError::new(
            ErrorKind::Unauthorized,
            format!("{principal} may not delete {user}"),
        ));
    }

    // Step 1: resolve via NameService.
    let uid = ctx
        .nameservice
        .uid_of_user(user)
        .ok_or_else(|| OrchestratorError::new(ErrorKind::UserNotFound, "unknown to name service"))?;

    // Step 2: range check.
    if !ctx.config.allocation.uid_in_range(uid) {
        return Err(OrchestratorError::new(
            ErrorKind::Unauthorized,
            format!("uid {uid} is outside the managed range"),
        ));
    }

    // Step 3: Kerberos get/delete, tolerating "not found".
    match ctx.kerberos.get_principal(user).await {
        Ok(_) => {
            if let Err(e) = ctx.kerberos.delete_principal(user).await {
                if !e.is_tolerable() {
                    return Err(OrchestratorError::new(ErrorKind::KerberosFailed, e.to_string()));
                }
                tracing::warn!(user, error = %e, "kadmin delete_principal failed; continuing");
            }
        }
        Err(e) if e.is_tolerable() => {
            tracing::warn!(user, "kerberos principal already gone");
        }
        Err(e) => return Err(OrchestratorError::new(ErrorKind::KerberosFailed, e.to_string())),
    }

    // Step 4: request the delete token from the home-directory daemon.
    let token = match ctx.homedir.request_delete_token(user).await {
        Ok(resp) if resp.status == "again" => resp
            .token
            .ok_or_else(|| OrchestratorError::new(ErrorKind::MkhomedirFailed, "again without a token"))?,
        Ok(resp) => {
            return Err(OrchestratorError::new(
                ErrorKind::MkhomedirFailed,
                format!("expected again, got {}", resp.status),
            ))
        }
        Err(e) => return Err(OrchestratorError::new(ErrorKind::MkhomedirConnect, e.to_string())),
    };

    // Step 5: LDAP deletes, each tolerating no-such-object.
    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let escaped = escape_filter_value(user);
    let person_dn = format!("uid={escaped},{}", ctx.directory.base_people());
    if let Err(e) = ctx.directory.delete(&mut ldap, &person_dn).await {
        warn_unless_tolerable(&e, "delete person entry");
    }
    let group_dn = format!("cn={escaped},{}", ctx.directory.base_group());
    if let Err(e) = ctx.directory.delete(&mut ldap, &group_dn).await {
        warn_unless_tolerable(&e, "delete primary group entry");
    }

    let filter = format!("(memberUid={escaped})");
    let groups = ctx
        .directory
        .search(&mut ldap, ctx.directory.base_group(), Scope::OneLevel, &filter, vec!["cn"])
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;
    for entry in groups {
        let Some(cn) = entry.attrs.get("cn").and_then(|v| v.first()) else {
            continue;
        };
        let dn = format!("cn={},{}", escape_filter_value(cn), ctx.directory.base_group());
        let mods = vec![ldap3::Mod::Delete("memberUid".to_string(), std::collections::HashSet::from([user.to_string()]))];
        if let Err(e) = ctx.directory.modify(&mut ldap, &dn, mods).await {
            warn_unless_tolerable(&e, "remove membership during delete");
        }
    }
    drop(ldap);

    if let Err(e) = garbage_collect_groups(ctx).await {
        tracing::warn!(error = %e, "group garbage collection failed during user delete");
    }

    // Step 6: flush cache.
    if let Err(e) = ctx.cacheflush.flush().await {
        return Err(OrchestratorError::new(ErrorKind::NscdflushdConnect, e.to_string()));
    }

    // Step 7: second-phase home directory delete, with the token.
    match ctx.homedir.delete_user(user, &token).await {
        Ok(resp) if resp.is_ok() => {}
        Ok(resp) => {
            return Err(OrchestratorError::new(
                ErrorKind::MkhomedirFailed,
                format!("delete returned {}", resp.status),
            ))
        }
        Err(e) => return Err(OrchestratorError::new(ErrorKind::MkhomedirConnect, e.to_string())),
    }

    Ok(())
}

fn warn_unless_tolerable(e: &DirectoryError, step: &'static str) {
    if e.is_tolerable() {
        tracing::warn!(step, "already done");
    } else {
        tracing::warn!(step, error = %e, "non-fatal directory error during delete");
    }
}
