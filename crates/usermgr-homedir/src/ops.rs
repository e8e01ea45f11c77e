//! Subprocess helpers: `rsync` for skeleton copies, `setfacl` for ACL
//! revocation, both matching `clumsy/mkhomedird.py`'s `copyDir`/`revokeAcl`.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// `rsync -av --chown=<uid>:<gid> <skel>/ <dest>/`. Returns whether the
/// subprocess exited successfully.
pub async fn copy_skeleton(skel: &Path, dest: &Path, uid: u32, gid: u32) -> std::io::Result<bool> {
    let src = with_trailing_slash(skel);
    let dst = with_trailing_slash(dest);
    let chown = format!("--chown={uid}:{gid}");
    tracing::info!(src = %src, dst = %dst, "copy_dir");

    let status = Command::new("rsync")
        .args(["-av", &chown, &src, &dst])
        .stdin(Stdio::null())
        .status()
        .await?;

    tracing::info!(result = ?status, "copy_dir_finished");
    Ok(status.success())
}

fn with_trailing_slash(p: &Path) -> String {
    let mut s = p.to_string_lossy().into_owned();
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

/// `setfacl -R -x u:<uid> -x d:u:<uid> ... -x g:<gid> -x d:g:<gid> ... -- <dirs>`.
///
/// Best-effort: logs the subprocess's output but never fails the caller —
/// matching `clumsy/mkhomedird.py`'s `revokeAcl`, which neither checks nor
/// propagates `setfacl`'s exit status (the directories themselves may
/// already be gone by the time this runs).
pub async fn revoke_acl(dirs: &[String], uids: &[u32], gids: &[u32]) {
    if dirs.is_empty() || (uids.is_empty() && gids.is_empty()) {
        return;
    }

    let mut args = vec!["-R".to_string()];
    for uid in uids {
        args.push("-x".into());
        args.push(format!("u:{uid}"));
        args.push("-x".into());
        args.push(format!("d:u:{uid}"));
    }
    for gid in gids {
        args.push("-x".into());
        args.push(format!("g:{gid}"));
        args.push("-x".into());
        args.push(format!("d:g:{gid}"));
    }
    args.push("--".to_string());
    args.extend(dirs.iter().cloned());

    tracing::info!(directories = ?dirs, uids = ?uids, gids = ?gids, "revoke_acl");
    match Command::new("setfacl")
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
    {
        Ok(output) => tracing::info!(
            status = ?output.status,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "revoke_acl_finished"
        ),
        Err(error) => tracing::warn!(%error, "revoke_acl_spawn_failed"),
    }
}

/// Substitute `{user}`, `{uid}`, `{gid}` in a [`usermgr_types::config::DirectoryRule`]
/// path template.
pub fn expand_template(template: &str, user: &str, uid: u32, gid: u32) -> String {
    template
        .replace("{user}", user)
        .replace("{uid}", &uid.to_string())
        .replace("{gid}", &gid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_all_placeholders() {
        assert_eq!(
            expand_template("/home/{user}", "jdoe", 1500, 1500),
            "/home/jdoe"
        );
        assert_eq!(
            expand_template("/scratch/{uid}-{gid}", "jdoe", 1500, 2000),
            "/scratch/1500-2000"
        );
    }
}
