//! An in-memory [`usermgr_core::NameService`] fake, so allocator and
//! handler tests can control exactly what resolves without a real
//! `nsswitch` stack.
//!
//! Grounded on the private `FakeNameService` already used by
//! `usermgr-core::nameservice`'s own unit tests; promoted here, and
//! extended with group support, so the orchestrator handler tests in this
//! crate's `tests/` directory can share one implementation instead of each
//! rolling their own.

use std::collections::HashMap;

use parking_lot::Mutex;

use usermgr_core::NameService;

#[derive(Default)]
struct State {
    users: HashMap<String, (u32, u32)>,
    groups: HashMap<String, (u32, Vec<String>)>,
}

/// A controllable, in-memory stand-in for the host's name-service stack.
#[derive(Default)]
pub struct FakeNameService {
    state: Mutex<State>,
}

impl FakeNameService {
    /// An empty fake: nothing resolves until seeded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` resolve to `uid` in both directions, with `gid` as its
    /// primary group.
    pub fn insert_user(&self, name: impl Into<String>, uid: u32, gid: u32) {
        self.state.lock().users.insert(name.into(), (uid, gid));
    }

    /// Stop `name` resolving at all (simulates the consistency wait's
    /// pre-flush "not yet observed" state, or a deleted account).
    pub fn remove_user(&self, name: &str) {
        self.state.lock().users.remove(name);
    }

    /// Make `name` resolve to `gid` with the given member list.
    pub fn insert_group(&self, name: impl Into<String>, gid: u32, members: Vec<String>) {
        self.state.lock().groups.insert(name.into(), (gid, members));
    }

    /// Remove a group's resolution entirely.
    pub fn remove_group(&self, name: &str) {
        self.state.lock().groups.remove(name);
    }
}

impl NameService for FakeNameService {
    fn uid_of_user(&self, name: &str) -> Option<u32> {
        self.state.lock().users.get(name).map(|(uid, _)| *uid)
    }

    fn user_of_uid(&self, uid: u32) -> Option<String> {
        self.state
            .lock()
            .users
            .iter()
            .find(|(_, (u, _))| *u == uid)
            .map(|(k, _)| k.clone())
    }

    fn primary_gid_of_user(&self, name: &str) -> Option<u32> {
        self.state.lock().users.get(name).map(|(_, gid)| *gid)
    }

    fn gid_of_group(&self, name: &str) -> Option<u32> {
        self.state.lock().groups.get(name).map(|(gid, _)| *gid)
    }

    fn group_of_gid(&self, gid: u32) -> Option<String> {
        self.state
            .lock()
            .groups
            .iter()
            .find(|(_, (g, _))| *g == gid)
            .map(|(k, _)| k.clone())
    }

    fn members_of_group(&self, name: &str) -> Option<Vec<String>> {
        self.state.lock().groups.get(name).map(|(_, m)| m.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_both_directions_for_users_and_groups() {
        let ns = FakeNameService::new();
        ns.insert_user("jdoe", 1500, 1500);
        ns.insert_group("labshare", 2500, vec!["jdoe".to_string()]);

        assert_eq!(ns.uid_of_user("jdoe"), Some(1500));
        assert_eq!(ns.user_of_uid(1500), Some("jdoe".to_string()));
        assert_eq!(ns.gid_of_group("labshare"), Some(2500));
        assert_eq!(ns.group_of_gid(2500), Some("labshare".to_string()));
        assert_eq!(ns.members_of_group("labshare"), Some(vec!["jdoe".to_string()]));
    }

    #[test]
    fn removal_makes_the_entry_unresolvable() {
        let ns = FakeNameService::new();
        ns.insert_user("jdoe", 1500, 1500);
        ns.remove_user("jdoe");
        assert_eq!(ns.uid_of_user("jdoe"), None);
    }
}
