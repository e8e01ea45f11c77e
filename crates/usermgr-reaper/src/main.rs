//! `ktwkd` ("kill them with kindness"): reaps processes whose real uid no
//! longer resolves to any account, grounded on
//! `clumsy/ktwkd.py`. Scans `/proc` once a minute; anything owned by a
//! departed account — left behind by a creation that raced past its
//! deletion, or a stale `setpriv`'d batch job — gets `SIGKILL`ed.

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use usermgr_core::{HostNameService, NameService};

/// Real uids below this are system/service accounts `ktwkd.py` never
/// touches, matching its hardcoded `minuid = 1000`.
const MIN_UID: u32 = 1000;

const SCAN_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcInfo {
    pid: i32,
    real_uid: u32,
}

/// Parse a `/proc/<pid>/status` file's `Uid:` line (`Uid:\t<real>\t<eff>\t<saved>\t<fs>`).
fn parse_real_uid(status: &str) -> Option<u32> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("Uid:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// List every PID currently in `/proc` along with its real uid. PIDs that
/// disappear between the directory listing and the read (the process
/// exited) are silently skipped, matching `Process.all()`'s
/// `ProcessLookupError` tolerance.
async fn list_processes() -> std::io::Result<Vec<ProcInfo>> {
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir("/proc").await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Ok(pid) = name.parse::<i32>() else { continue };

        let status_path = format!("/proc/{pid}/status");
        let Ok(status) = tokio::fs::read_to_string(&status_path).await else {
            continue;
        };
        if let Some(real_uid) = parse_real_uid(&status) {
            out.push(ProcInfo { pid, real_uid });
        }
    }
    Ok(out)
}

/// Processes whose real uid is in the managed range but no longer
/// resolves to any account.
fn orphaned<'a>(processes: &'a [ProcInfo], ns: &dyn NameService, min_uid: u32) -> Vec<&'a ProcInfo> {
    processes
        .iter()
        .filter(|p| p.real_uid >= min_uid && ns.user_of_uid(p.real_uid).is_none())
        .collect()
}

/// `SIGKILL` one process, tolerating it having already raced us to exit
/// (`ESRCH`) or this daemon lacking the privilege to reach it (`EPERM`,
/// logged since it means the daemon isn't running as root).
fn kill_tolerant(pid: i32) {
    match kill(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(nix::errno::Errno::EPERM) => {
            tracing::error!(pid, "cannot kill, are we root?");
        }
        Err(error) => tracing::warn!(pid, %error, "unexpected kill error"),
    }
}

async fn reap_once(ns: &dyn NameService) {
    tracing::debug!("searching for orphaned procs");
    let processes = match list_processes().await {
        Ok(p) => p,
        Err(error) => {
            tracing::warn!(%error, "failed to list /proc");
            return;
        }
    };
    for victim in orphaned(&processes, ns, MIN_UID) {
        tracing::info!(pid = victim.pid, uid = victim.real_uid, "killing orphaned process");
        kill_tolerant(victim.pid);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ns = HostNameService;
    loop {
        reap_once(&ns).await;
        tokio::time::sleep(SCAN_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usermgr_testing::FakeNameService;

    #[test]
    fn parses_the_uid_line() {
        let status = "Name:\tsleep\nState:\tS (sleeping)\nUid:\t1500\t1500\t1500\t1500\nGid:\t1500\t1500\t1500\t1500\n";
        assert_eq!(parse_real_uid(status), Some(1500));
    }

    #[test]
    fn missing_uid_line_yields_none() {
        assert_eq!(parse_real_uid("Name:\tsleep\n"), None);
    }

    #[test]
    fn orphaned_filters_by_uid_range_and_resolution() {
        let ns = FakeNameService::new();
        ns.insert_user("jdoe", 1500, 1500);
        let processes = vec![
            ProcInfo { pid: 1, real_uid: 500 },    // below MIN_UID: system account, ignored
            ProcInfo { pid: 2, real_uid: 1500 },   // resolves: not orphaned
            ProcInfo { pid: 3, real_uid: 1600 },   // does not resolve: orphaned
        ];
        let victims = orphaned(&processes, &ns, MIN_UID);
        assert_eq!(victims.len(), 1);
        assert_eq!(victims[0].pid, 3);
    }

    #[tokio::test]
    async fn reap_once_tolerates_a_pid_that_is_already_gone() {
        // Regression guard: a PID this large should never exist, so
        // kill_tolerant must swallow ESRCH rather than panicking the loop.
        kill_tolerant(i32::MAX);
    }
}
