//! Add/remove group membership.

use std::collections::HashSet;

use ldap3::{Mod, Scope};

use usermgr_directory::escape_filter_value;
use usermgr_types::error::ErrorKind;

use crate::consistency::{consistency_wait, Resolution};
use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};
use crate::handlers::gc::garbage_collect_groups;

/// Add `member` to `group`. The authenticated `principal` must already be
/// a member of `group`; `member` must resolve via NameService.
#[tracing::instrument(skip(ctx, principal))]
pub async fn add_member(ctx: &AppContext, principal: &str, group: &str, member: &str) -> Result<()> {
    if ctx.nameservice.gid_of_group(group).is_none() {
        return Err(OrchestratorError::new(ErrorKind::NotAMember, "unknown group"));
    }

    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let escaped_group = escape_filter_value(group);
    let dn = format!("cn={escaped_group},{}", ctx.directory.base_group());
    let entries = ctx
        .directory
        .search(&mut ldap, &dn, Scope::Base, "(objectClass=posixGroup)", vec!["memberUid"])
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;
    let members: HashSet<String> = entries
        .into_iter()
        .next()
        .and_then(|e| e.attrs.get("memberUid").cloned())
        .map(|v| v.into_iter().collect())
        .unwrap_or_default();

    if !members.contains(principal) {
        return Err(OrchestratorError::new(
            ErrorKind::NotAMember,
            format!("{principal} is not a member of {group}"),
        ));
    }
    if ctx.nameservice.uid_of_user(member).is_none() {
        return Err(OrchestratorError::new(ErrorKind::UserNotFound, "modified user unknown"));
    }

    let mods = vec![Mod::Add(
        "memberUid".to_string(),
        HashSet::from([member.to_string()]),
    )];
    if let Err(e) = ctx.directory.modify(&mut ldap, &dn, mods).await {
        if e.is_tolerable() {
            tracing::warn!(group, member, "already a member");
        } else {
            return Err(OrchestratorError::new(ErrorKind::Bug, e.to_string()));
        }
    }
    drop(ldap);

    let ns = ctx.nameservice.clone();
    let group_owned = group.to_string();
    let member_owned = member.to_string();
    consistency_wait(&ctx.cacheflush, move || match ns.members_of_group(&group_owned) {
        Some(members) if members.iter().any(|m| m == &member_owned) => Resolution::Matched,
        Some(_) | None => Resolution::Pending,
    })
    .await
    .map_err(|_| OrchestratorError::new(ErrorKind::ResolveTimeout, "membership add did not resolve"))?;
    Ok(())
}

/// Remove `member` from `group`. Refuses if `group` is anyone's primary
/// group.
#[tracing::instrument(skip(ctx, principal))]
pub async fn remove_member(ctx: &AppContext, principal: &str, group: &str, member: &str) -> Result<()> {
    if ctx.nameservice.uid_of_user(principal).is_none() {
        return Err(OrchestratorError::new(ErrorKind::UserNotFound, "caller unknown"));
    }
    let gid = ctx
        .nameservice
        .gid_of_group(group)
        .ok_or_else(|| OrchestratorError::new(ErrorKind::NotAMemberRemove, "unknown group"))?;

    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let primary_filter = format!("(gidNumber={gid})");
    let owners = ctx
        .directory
        .search(&mut ldap, ctx.directory.base_people(), Scope::OneLevel, &primary_filter, vec!["uid"])
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;
    if !owners.is_empty() {
        return Err(OrchestratorError::new(
            ErrorKind::PrimaryGroup,
            format!("{group} is someone's primary group"),
        ));
    }

    let escaped_group = escape_filter_value(group);
    let dn = format!("cn={escaped_group},{}", ctx.directory.base_group());
    let mods = vec![Mod::Delete(
        "memberUid".to_string(),
        HashSet::from([member.to_string()]),
    )];
    match ctx.directory.modify(&mut ldap, &dn, mods).await {
        Ok(()) => {}
        Err(e) if e.is_tolerable() => {
            return Err(OrchestratorError::new(ErrorKind::NotAMemberRemove, "not a member"));
        }
        Err(e) => return Err(OrchestratorError::new(ErrorKind::Bug, e.to_string())),
    }
    drop(ldap);

    if let Err(e) = garbage_collect_groups(ctx).await {
        tracing::warn!(error = %e, "group garbage collection failed during member removal");
    }

    let ns = ctx.nameservice.clone();
    let member_owned = member.to_string();
    let group_owned = group.to_string();
    consistency_wait(&ctx.cacheflush, move || match ns.members_of_group(&group_owned) {
        // The group itself may have been garbage-collected if this was its
        // last member; either way is "resolved absence".
        None => Resolution::Matched,
        Some(members) if !members.iter().any(|m| m == &member_owned) => Resolution::Matched,
        Some(_) => Resolution::Pending,
    })
    .await
    .map_err(|_| OrchestratorError::new(ErrorKind::ResolveTimeout, "membership removal did not resolve"))?;

    Ok(())
}
