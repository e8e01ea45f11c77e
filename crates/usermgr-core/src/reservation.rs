//! Process-wide reservation sets, preventing
//! two concurrent allocator runs from handing out the same uid, gid, or
//! synthesized name before either lands in LDAP.
//!
//! The original single-threaded cooperative scheduler could get away with
//! logical discipline alone; `usermgr-server` runs on `tokio`'s
//! multi-threaded runtime, so a real lock is used here rather than leaning
//! on an assumption the deployment doesn't actually hold.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

/// A set of values, each held by exactly one in-flight request at a time.
pub struct ReservationSet<T> {
    held: Mutex<HashSet<T>>,
}

impl<T> ReservationSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// An empty reservation set.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(HashSet::new()),
        })
    }

    /// Attempt to reserve `value`. Returns `None` if already held.
    ///
    /// Takes `self: &Arc<Self>` so the returned guard can outlive the
    /// borrow that produced it and release on drop regardless of where the
    /// handler's control flow ends.
    #[must_use]
    pub fn try_reserve(self: &Arc<Self>, value: T) -> Option<ReservationGuard<T>> {
        let mut held = self.held.lock();
        if held.contains(&value) {
            None
        } else {
            held.insert(value.clone());
            Some(ReservationGuard {
                set: Arc::clone(self),
                value,
            })
        }
    }

    /// Whether `value` is currently reserved (test helper).
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.held.lock().contains(value)
    }
}

/// Releases its value from the owning [`ReservationSet`] on drop —
/// "removed on exit (success or failure)".
pub struct ReservationGuard<T: Eq + Hash + Clone + Send + Sync + 'static> {
    set: Arc<ReservationSet<T>>,
    value: T,
}

impl<T: Eq + Hash + Clone + Send + Sync + 'static> ReservationGuard<T> {
    /// The reserved value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: Eq + Hash + Clone + Send + Sync + 'static> Drop for ReservationGuard<T> {
    fn drop(&mut self) {
        self.set.held.lock().remove(&self.value);
    }
}

/// The four axes that need collision avoidance across concurrent requests:
/// uids, gids, synthesized/derived login names, and group names.
///
/// Naming only reserved uids and group names and leaving reserved login
/// names implicit invites an inconsistency; rather than guess which axis a
/// caller meant, all four get their own set, a strict superset of either
/// reading (see DESIGN.md).
pub struct ReservationSets {
    /// Reserved uids (also used for gids of primary user groups, which
    /// always equal the owning uid).
    pub uids: Arc<ReservationSet<u32>>,
    /// Reserved gids for standalone (non-primary) groups.
    pub gids: Arc<ReservationSet<u32>>,
    /// Reserved login names.
    pub usernames: Arc<ReservationSet<String>>,
    /// Reserved group names.
    pub groupnames: Arc<ReservationSet<String>>,
}

impl ReservationSets {
    /// Four empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uids: ReservationSet::new(),
            gids: ReservationSet::new(),
            usernames: ReservationSet::new(),
            groupnames: ReservationSet::new(),
        }
    }
}

impl Default for ReservationSets {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_reservation_of_the_same_value_fails() {
        let set = ReservationSet::<u32>::new();
        let first = set.try_reserve(1000);
        assert!(first.is_some());
        assert!(set.try_reserve(1000).is_none());
    }

    #[test]
    fn dropping_the_guard_releases_the_value() {
        let set = ReservationSet::<u32>::new();
        {
            let _guard = set.try_reserve(1000).unwrap();
            assert!(set.contains(&1000));
        }
        assert!(!set.contains(&1000));
        assert!(set.try_reserve(1000).is_some());
    }
}
