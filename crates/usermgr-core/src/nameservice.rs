//! NameService resolver: maps user name to numeric uid and group name to
//! numeric gid against the host's configured name-service stack, read-only
//! from *usermgr*'s view, grounded in `clumsy/nss.py`'s thin wrapper over
//! `pwd`/`grp`.

/// Read-only view of the host's name-service stack (NSS/SSSD/LDAP
/// `nsswitch` chain — whatever the deployment has configured; *usermgr*
/// itself never writes to it, only waits for it to catch up).
pub trait NameService: Send + Sync {
    /// `getpwnam`-equivalent: the uid owning `name`, if any.
    fn uid_of_user(&self, name: &str) -> Option<u32>;
    /// `getpwuid`-equivalent: the login name owning `uid`, if any.
    fn user_of_uid(&self, uid: u32) -> Option<String>;
    /// The primary gid of `name`'s passwd entry, if `name` resolves.
    fn primary_gid_of_user(&self, name: &str) -> Option<u32>;
    /// `getgrnam`-equivalent: the gid owning `name`, if any.
    fn gid_of_group(&self, name: &str) -> Option<u32>;
    /// `getgrgid`-equivalent: the group name owning `gid`, if any.
    fn group_of_gid(&self, gid: u32) -> Option<String>;
    /// The resolved member list of `name`, if the group itself resolves.
    fn members_of_group(&self, name: &str) -> Option<Vec<String>>;
}

/// The real, host-backed [`NameService`], implemented on top of `nix`'s
/// `getpwnam_r`/`getpwuid_r`/`getgrnam_r`/`getgrgid_r` wrappers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostNameService;

impl NameService for HostNameService {
    fn uid_of_user(&self, name: &str) -> Option<u32> {
        nix::unistd::User::from_name(name)
            .ok()
            .flatten()
            .map(|u| u.uid.as_raw())
    }

    fn user_of_uid(&self, uid: u32) -> Option<String> {
        nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
            .ok()
            .flatten()
            .map(|u| u.name)
    }

    fn primary_gid_of_user(&self, name: &str) -> Option<u32> {
        nix::unistd::User::from_name(name)
            .ok()
            .flatten()
            .map(|u| u.gid.as_raw())
    }

    fn gid_of_group(&self, name: &str) -> Option<u32> {
        nix::unistd::Group::from_name(name)
            .ok()
            .flatten()
            .map(|g| g.gid.as_raw())
    }

    fn group_of_gid(&self, gid: u32) -> Option<String> {
        nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid))
            .ok()
            .flatten()
            .map(|g| g.name)
    }

    fn members_of_group(&self, name: &str) -> Option<Vec<String>> {
        nix::unistd::Group::from_name(name)
            .ok()
            .flatten()
            .map(|g| g.mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeNameService {
        users: std::sync::Mutex<std::collections::HashMap<String, u32>>,
    }

    impl NameService for FakeNameService {
        fn uid_of_user(&self, name: &str) -> Option<u32> {
            self.users.lock().unwrap().get(name).copied()
        }

        fn user_of_uid(&self, uid: u32) -> Option<String> {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|(_, &v)| v == uid)
                .map(|(k, _)| k.clone())
        }

        fn primary_gid_of_user(&self, _name: &str) -> Option<u32> {
            None
        }

        fn gid_of_group(&self, _name: &str) -> Option<u32> {
            None
        }

        fn group_of_gid(&self, _gid: u32) -> Option<String> {
            None
        }

        fn members_of_group(&self, _name: &str) -> Option<Vec<String>> {
            None
        }
    }

    #[test]
    fn fake_resolves_both_directions() {
        let ns = FakeNameService::default();
        ns.users.lock().unwrap().insert("jdoe".into(), 1500);
        assert_eq!(ns.uid_of_user("jdoe"), Some(1500));
        assert_eq!(ns.user_of_uid(1500), Some("jdoe".to_string()));
        assert_eq!(ns.uid_of_user("nobody"), None);
    }
}
