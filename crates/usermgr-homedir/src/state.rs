//! Shared state: the in-flight `running` guard set and the delete-token
//! table, both grounded on `clumsy/mkhomedird.py`'s module-level `running`
//! and `deleteToken` globals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::distr::{Alphanumeric, SampleString};

use usermgr_core::NameService;
use usermgr_types::Config;

/// How long a delete token remains usable (`clumsy/mkhomedird.py`: 60s).
pub const TOKEN_TTL: Duration = Duration::from_secs(60);

/// A pending home-directory deletion, issued by the first `DELETE
/// /user/<name>` call and consumed by the second.
pub struct DeleteToken {
    pub issued_at: Instant,
    pub user: String,
    pub uid: u32,
    pub gid: u32,
}

/// Process-wide state shared by every request handler.
pub struct AppState {
    pub config: Config,
    pub nameservice: Arc<dyn NameService>,
    running: Mutex<HashSet<String>>,
    tokens: Mutex<HashMap<String, DeleteToken>>,
}

impl AppState {
    pub fn new(config: Config, nameservice: Arc<dyn NameService>) -> Self {
        Self {
            config,
            nameservice,
            running: Mutex::new(HashSet::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Try to mark `user` as having a creation/deletion in flight. Returns
    /// `None` if one is already running, mirroring the `in_progress` 202
    /// response: at most one creation per user at a time.
    pub fn try_start(&self, user: &str) -> Option<RunningGuard<'_>> {
        let mut running = self.running.lock();
        if running.contains(user) {
            return None;
        }
        running.insert(user.to_string());
        Some(RunningGuard {
            running: &self.running,
            user: user.to_string(),
        })
    }

    /// Issue a fresh, unused delete token for `user`.
    pub fn issue_token(&self, user: &str, uid: u32, gid: u32) -> String {
        let mut tokens = self.tokens.lock();
        loop {
            let candidate = Alphanumeric.sample_string(&mut rand::rng(), 32);
            if tokens.contains_key(&candidate) {
                continue;
            }
            tokens.insert(
                candidate.clone(),
                DeleteToken {
                    issued_at: Instant::now(),
                    user: user.to_string(),
                    uid,
                    gid,
                },
            );
            return candidate;
        }
    }

    /// Consume `token` if it exists and belongs to `user`, regardless of
    /// expiry (the caller checks `issued_at` itself so it can distinguish
    /// "invalid" from "expired").
    pub fn take_token(&self, token: &str, user: &str) -> Option<DeleteToken> {
        let mut tokens = self.tokens.lock();
        match tokens.get(token) {
            Some(t) if t.user == user => tokens.remove(token),
            _ => None,
        }
    }
}

/// Removes its user from the `running` set on drop, so every early return
/// in the create/delete handlers releases the guard automatically.
pub struct RunningGuard<'a> {
    running: &'a Mutex<HashSet<String>>,
    user: String,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.lock().remove(&self.user);
    }
}
