//! Create-group orchestration.

use std::collections::HashSet;

use usermgr_types::error::ErrorKind;
use usermgr_types::model::Group;

use crate::allocator::{self, NameOptions};
use crate::consistency::{consistency_wait, ConsistencyError, Resolution};
use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};

/// `POST /group/<name>`: allocate a gid and add a posix group owned by the
/// authenticated caller.
///
/// `principal` must resolve via NameService and lie within the managed uid
/// range.
#[tracing::instrument(skip(ctx, principal))]
pub async fn create_group(ctx: &AppContext, principal: &str, name: &str) -> Result<Group> {
    let owner_uid = ctx
        .nameservice
        .uid_of_user(principal)
        .ok_or_else(|| OrchestratorError::new(ErrorKind::UserNotFound, "caller unknown"))?;
    if owner_uid < ctx.config.allocation.min_uid || owner_uid >= ctx.config.allocation.max_uid {
        return Err(OrchestratorError::new(
            ErrorKind::Unauthorized,
            format!("{principal} is outside the managed uid range"),
        ));
    }

    let mut rng = rand::rng();
    let gid_guard = allocator::allocate_numeric(
        ctx.config.allocation.min_gid,
        ctx.config.allocation.max_gid,
        &ctx.reservations.gids,
        ctx.nameservice.as_ref(),
        |ns, gid| ns.group_of_gid(gid).is_none(),
        &mut rng,
    )
    .ok_or_else(|| OrchestratorError::new(ErrorKind::Gid, "gid candidate draw exhausted"))?;
    let gid = *gid_guard.value();

    // As with create-user's synthesized names, the uid-derived variant
    // needs no separate name reservation: the gid reservation alone
    // prevents a collision.
    let (group, _name_guard) = if ctx.config.synthesize_names_from_uid {
        (format!("group-{}", allocator::encode_quint(gid)), None)
    } else {
        let candidates = allocator::possible_groupnames(principal, name, &NameOptions::default());
        let guard = allocator::allocate_name(
            candidates,
            &ctx.reservations.groupnames,
            ctx.nameservice.as_ref(),
            |ns, name| ns.gid_of_group(name).is_none(),
        )
        .ok_or_else(|| OrchestratorError::new(ErrorKind::Groupname, "groupname candidates exhausted"))?;
        let name = guard.value().clone();
        (name, Some(guard))
    };

    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let dn = format!("cn={group},{}", ctx.directory.base_group());
    let gid_s = gid.to_string();
    let attrs = vec![
        ("objectClass", HashSet::from(["top", "posixGroup"])),
        ("cn", HashSet::from([group.as_str()])),
        ("gidNumber", HashSet::from([gid_s.as_str()])),
        ("memberUid", HashSet::from([principal])),
    ];
    if let Err(e) = ctx.directory.add(&mut ldap, &dn, attrs).await {
        return Err(OrchestratorError::new(ErrorKind::GroupExists, e.to_string()));
    }
    drop(ldap);

    let ns = ctx.nameservice.clone();
    let group_for_check = group.clone();
    let gid_for_check = gid;
    consistency_wait(&ctx.cacheflush, move || {
        match (
            ns.gid_of_group(&group_for_check),
            ns.group_of_gid(gid_for_check),
        ) {
            (Some(g), Some(n)) if g == gid_for_check && n == group_for_check => Resolution::Matched,
            (Some(_), Some(_)) => Resolution::Mismatch,
            _ => Resolution::Pending,
        }
    })
    .await
    .map_err(|e| match e {
        ConsistencyError::Mismatch | ConsistencyError::Timeout => {
            OrchestratorError::new(ErrorKind::ResolveTimeout, "group consistency wait did not resolve")
        }
    })?;

    let members = ctx
        .nameservice
        .members_of_group(&group)
        .unwrap_or_else(|| vec![principal.to_string()]);

    Ok(Group {
        name: group,
        gid,
        members,
    })
}
