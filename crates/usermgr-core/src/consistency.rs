//! Consistency wait: up to 60 one-second
//! iterations, each flushing the NSS cache and then checking resolution,
//! absorbing the read-after-write gap between the directory and the host's
//! name-service cache.

use std::time::Duration;

use usermgr_clients::CacheFlushClient;

/// Outcome of one resolution check inside the consistency wait.
pub enum Resolution {
    /// Both directions resolved and agree; the wait is over.
    Matched,
    /// Both directions resolved but disagree; this is a hard failure, not
    /// a reason to keep retrying.
    Mismatch,
    /// Not yet resolved on at least one side; keep waiting.
    Pending,
}

/// Why a consistency wait did not end in [`Resolution::Matched`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConsistencyError {
    /// The two resolution directions disagreed.
    Mismatch,
    /// 60 iterations passed without resolution.
    Timeout,
}

const MAX_ITERATIONS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Flush the cache and call `check` up to 60 times, one second apart,
/// until it reports [`Resolution::Matched`] or [`Resolution::Mismatch`].
///
/// `check` is re-evaluated after every flush; a flush failure is logged
/// and does not by itself end the wait, since the *check* — not the flush
/// — is the single source of truth the loop's exit is tied to.
pub async fn consistency_wait<F>(
    cache: &CacheFlushClient,
    mut check: F,
) -> Result<(), ConsistencyError>
where
    F: FnMut() -> Resolution,
{
    for _ in 0..MAX_ITERATIONS {
        if let Err(e) = cache.flush().await {
            tracing::warn!(error = %e, "cache flush failed during consistency wait");
        }
        match check() {
            Resolution::Matched => return Ok(()),
            Resolution::Mismatch => return Err(ConsistencyError::Mismatch),
            Resolution::Pending => {}
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(ConsistencyError::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_bound_matches_spec() {
        assert_eq!(MAX_ITERATIONS, 60);
        assert_eq!(POLL_INTERVAL, Duration::from_secs(1));
    }
}
