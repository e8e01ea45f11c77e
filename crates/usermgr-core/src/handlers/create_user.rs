//! Create-user orchestration.

use std::collections::HashSet;

use usermgr_types::ascii::keep_ascii;
use usermgr_types::error::ErrorKind;
use usermgr_types::model::{Account, UserRequest};

use crate::allocator::{self, NameOptions};
use crate::consistency::{consistency_wait, ConsistencyError, Resolution};
use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};
use crate::handlers::password;
use crate::rollback::RollbackScope;

const KERBEROS_EXPIRE_DEFAULT: &str = "never";

/// `POST /user`: provision an LDAP entry, primary group, Kerberos
/// principal, and home directory for a new account.
///
/// `principal` is the authenticated caller's local part; only
/// `AUTHORIZATION_CREATE` may call this.
#[tracing::instrument(skip(ctx, request, principal))]
pub async fn create_user(
    ctx: &AppContext,
    principal: &str,
    request: UserRequest,
) -> Result<Account> {
    if principal != ctx.config.authorization_create {
        return Err(OrchestratorError::new(
            ErrorKind::Unauthorized,
            format!("{principal} is not the create-authorized principal"),
        ));
    }
    if !request.is_valid() {
        return Err(OrchestratorError::new(
            ErrorKind::Bug,
            "request has neither a preferred username nor both names",
        ));
    }

    let mut scope = RollbackScope::new();

    // Step 2: allocate uid (reserved) and login name.
    let mut rng = rand::rng();
    let uid_guard = allocator::allocate_numeric(
        ctx.config.allocation.min_uid,
        ctx.config.allocation.max_uid,
        &ctx.reservations.uids,
        ctx.nameservice.as_ref(),
        |ns, uid| ns.user_of_uid(uid).is_none(),
        &mut rng,
    )
    .ok_or_else(|| OrchestratorError::new(ErrorKind::Uid, "uid candidate draw exhausted"))?;
    let uid = *uid_guard.value();

    // Held for the rest of the handler so no other request can pick the
    // same derived name before this one lands in LDAP; `None` when the
    // name is synthesized from the (already-reserved) uid, since in that
    // case no separate name can collide.
    let (user, _name_guard) = if ctx.config.synthesize_names_from_uid {
        (format!("user-{}", allocator::encode_quint(uid)), None)
    } else {
        let candidates = allocator::possible_usernames(&request, &NameOptions::default());
        let guard = allocator::allocate_name(
            candidates,
            &ctx.reservations.usernames,
            ctx.nameservice.as_ref(),
            |ns, name| ns.uid_of_user(name).is_none(),
        )
        .ok_or_else(|| OrchestratorError::new(ErrorKind::Username, "username candidates exhausted"))?;
        let name = guard.value().clone();
        (name, Some(guard))
    };

    let home = ctx.config.home_template.replace("{user}", &user);
    let email = request.email.as_deref().map(keep_ascii).unwrap_or_default();
    let gecos = request.username.as_deref().map(keep_ascii).unwrap_or_default();
    let description = request.authorization.clone().unwrap_or_default();
    let given_name = request.first_name.clone().unwrap_or_else(|| user.clone());
    let surname = request.last_name.clone().unwrap_or_else(|| user.clone());

    // Step 3: add the LDAP person entry.
    // The closed error-kind set has no dedicated "LDAP unreachable" kind;
    // this is exactly what `Bug` exists for (never silently swallowed).
    let mut ldap = ctx
        .directory
        .connect()
        .await
        .map_err(|e| OrchestratorError::new(ErrorKind::Bug, e.to_string()))?;

    let dn = format!("uid={user},{}", ctx.directory.base_people());
    let mut classes: HashSet<&str> = [
        "top",
        "person",
        "organizationalPerson",
        "inetOrgPerson",
        "posixAccount",
        "shadowAccount",
    ]
    .into_iter()
    .collect();
    for extra in ctx.directory.extra_classes() {
        classes.insert(extra.as_str());
    }
    let uid_s = uid.to_string();
    let attrs = vec![
        ("objectClass", classes),
        ("sn", HashSet::from([surname.as_str()])),
        ("cn", HashSet::from([user.as_str()])),
        ("givenName", HashSet::from([given_name.as_str()])),
        ("mail", HashSet::from([email.as_str()])),
        ("uid", HashSet::from([user.as_str()])),
        ("uidNumber", HashSet::from([uid_s.as_str()])),
        ("gidNumber", HashSet::from([uid_s.as_str()])),
        ("homeDirectory", HashSet::from([home.as_str()])),
        ("loginShell", HashSet::from(["/bin/bash"])),
        ("gecos", HashSet::from([gecos.as_str()])),
        ("description", HashSet::from([description.as_str()])),
    ];

    // Nothing has committed yet at this point, so a failure here needs no
    // rollback — the first successful `add` is what starts the scope.
    if let Err(e) = ctx.directory.add(&mut ldap, &dn, attrs).await {
        return Err(OrchestratorError::new(ErrorKind::UserExists, e.to_string()));
    }

    {
        let directory = ctx.directory.clone();
        let dn = dn.clone();
        scope.push::<_, _, usermgr_directory::DirectoryError>("delete user entry", move || async move {
            let mut ldap = directory.connect().await.map_err(|_| usermgr_directory::DirectoryError::Protocol("reconnect failed".into()))?;
            directory.delete(&mut ldap, &dn).await
        });
    }
    {
        let cacheflush = ctx.cacheflush.clone();
        scope.push::<_, _, usermgr_clients::SiblingError>("flush cache", move || async move {
            cacheflush.flush().await.map(|_| ())
        });
    }

    // Step 4: add the matching primary group.
    let group_dn = format!("cn={user},{}", ctx.directory.base_group());
    let group_attrs = vec![
        ("objectClass", HashSet::from(["top", "posixGroup"])),
        ("cn", HashSet::from([user.as_str()])),
        ("gidNumber", HashSet::from([uid_s.as_str()])),
        ("memberUid", HashSet::from([user.as_str()])),
    ];
    if let Err(e) = ctx.directory.add(&mut ldap, &group_dn, group_attrs).await {
        scope.unwind().await;
        return Err(OrchestratorError::new(ErrorKind::GroupExists, e.to_string()));
    }

    // Step 5: close the LDAP connection, enter the consistency wait.
    drop(ldap);
    let ns = ctx.nameservice.clone();
    let uid_for_check = uid;
    let user_for_check = user.clone();
    let wait = consistency_wait(&ctx.cacheflush, move || {
        let by_name = ns.uid_of_user(&user_for_check);
        let by_uid = ns.user_of_uid(uid_for_check);
        match (by_name, by_uid) {
            (Some(n), Some(u)) if n == uid_for_check && u == user_for_check => Resolution::Matched,
            (Some(_), Some(_)) => Resolution::Mismatch,
            _ => Resolution::Pending,
        }
    })
    .await;
    if let Err(e) = wait {
        scope.unwind().await;
        let kind = match e {
            ConsistencyError::Mismatch => ErrorKind::UserMismatch,
            ConsistencyError::Timeout => ErrorKind::UserAddFailed,
        };
        return Err(OrchestratorError::new(kind, "consistency wait did not resolve"));
    }

    // Step 6: Kerberos principal.
    let password = password::generate();
    let expire = ctx
        .config
        .kerberos
        .expire
        .clone()
        .unwrap_or_else(|| KERBEROS_EXPIRE_DEFAULT.to_string());
    if let Err(e) = ctx.kerberos.add_principal(&user, &password, &expire).await {
        scope.unwind().await;
        return Err(OrchestratorError::new(ErrorKind::KerberosFailed, e.to_string()));
    }
    {
        let kerberos = ctx.kerberos.clone();
        let user = user.clone();
        scope.push::<_, _, usermgr_kerberos::KerberosError>("delete principal", move || async move {
            kerberos.delete_principal(&user).await
        });
    }

    // Step 7: home directory.
    match ctx.homedir.create_user(&user).await {
        Ok(resp) if resp.is_ok() => {}
        Ok(resp) => {
            scope.unwind().await;
            return Err(OrchestratorError::new(
                ErrorKind::MkhomedirFailed,
                format!("mkhomedird returned {}", resp.status),
            ));
        }
        Err(e) => {
            scope.unwind().await;
            return Err(OrchestratorError::new(ErrorKind::MkhomedirConnect, e.to_string()));
        }
    }

    scope.commit();
    // `uid_guard`/`_name_guard` are dropped here, releasing the
    // reservations now that the account is durable in LDAP/Kerberos and
    // NameService has observed it.
    Ok(Account {
        user,
        uid,
        gid: uid,
        password,
        home,
    })
}
