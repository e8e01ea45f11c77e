//! Garbage collection of empty groups.

use ldap3::Scope;

use usermgr_types::error::ErrorKind;

use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};

/// Delete every posix group in the managed gid range with no members, and
/// tell the home-directory daemon to revoke their leftover ACLs.
pub async fn garbage_collect_groups(ctx: &AppContext) -> Result<()> {
    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let filter = format!(
        "(&(objectClass=posixGroup)(gidNumber>={})(gidNumber<={})(!(memberUid=*)))",
        ctx.config.allocation.min_gid, ctx.config.allocation.max_gid
    );
    let entries = ctx
        .directory
        .search(&mut ldap, ctx.directory.base_group(), Scope::OneLevel, &filter, vec!["cn", "gidNumber"])
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let mut deleted_gids = Vec::new();
    for entry in entries {
        let Some(gid) = entry
            .attrs
            .get("gidNumber")
            .and_then(|v| v.first())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };
        match ctx.directory.delete(&mut ldap, &entry.dn).await {
            Ok(()) => deleted_gids.push(gid),
            Err(e) if e.is_tolerable() => {
                tracing::warn!(dn = %entry.dn, "group already deleted concurrently");
            }
            Err(e) => return Err(OrchestratorError::new(ErrorKind::Bug, e.to_string())),
        }
    }
    drop(ldap);

    if deleted_gids.is_empty() {
        return Ok(());
    }

    match ctx.homedir.delete_group(&deleted_gids).await {
        Ok(resp) if resp.is_ok() => Ok(()),
        Ok(resp) => Err(OrchestratorError::new(
            ErrorKind::MkhomedirGroupDelete,
            format!("delete_group returned {}", resp.status),
        )),
        Err(e) => Err(OrchestratorError::new(ErrorKind::MkhomedirGroupDelete, e.to_string())),
    }
}
