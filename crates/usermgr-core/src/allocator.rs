//! Identifier allocation: login-name, group-name, uid, and
//! gid candidate generation plus the reserve-until-free loop that ties
//! candidates to a [`ReservationSet`] and a [`NameService`].

use rand::Rng;

use usermgr_types::model::UserRequest;

use crate::nameservice::NameService;
use crate::reservation::{ReservationGuard, ReservationSet};

/// Tunables for login/group name candidate generation.
#[derive(Debug, Clone, Copy)]
pub struct NameOptions {
    /// Candidates shorter than this are skipped.
    pub minlen: usize,
    /// Candidates are truncated to this length, suffix included.
    pub maxlen: usize,
    /// Highest numeric suffix tried (`1..=suffix_limit`).
    pub suffix_limit: u32,
}

impl Default for NameOptions {
    fn default() -> Self {
        Self {
            minlen: 3,
            maxlen: 16,
            suffix_limit: 9,
        }
    }
}

/// Transliterate to ASCII, drop anything outside `[a-z0-9]`, lowercase.
fn transliterate_alnum(s: &str) -> String {
    deunicode::deunicode(s)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Transliterate to ASCII, keep `[a-z0-9-]`, lowercase (group-name variant,
/// which keeps the literal hyphen joining owner and name).
fn transliterate_alnum_hyphen(s: &str) -> String {
    deunicode::deunicode(s)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Truncate `base` to leave room for `suffix`, append it, and reject the
/// result if it is too short or starts with a digit.
fn build_candidate(base: &str, suffix: &str, opts: &NameOptions) -> Option<String> {
    let budget = opts.maxlen.checked_sub(suffix.len())?;
    if budget == 0 {
        return None;
    }
    let truncated: String = base.chars().take(budget).collect();
    if truncated.is_empty() {
        return None;
    }
    let candidate = format!("{truncated}{suffix}");
    if candidate.len() < opts.minlen {
        return None;
    }
    if candidate.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(candidate)
}

/// `possibleUsernames`: `preferred`, `firstInitial+last`, then the same two
/// with numeric suffixes, interleaved in that order.
#[must_use]
pub fn possible_usernames(req: &UserRequest, opts: &NameOptions) -> Vec<String> {
    let preferred = req
        .username
        .as_deref()
        .map(transliterate_alnum)
        .filter(|s| !s.is_empty());

    let derived = {
        let first = transliterate_alnum(req.first_name.as_deref().unwrap_or(""));
        let last = transliterate_alnum(req.last_name.as_deref().unwrap_or(""));
        let initial = first.chars().next().map(String::from).unwrap_or_default();
        let combined = format!("{initial}{last}");
        (!combined.is_empty()).then_some(combined)
    };

    let bases: Vec<&String> = [preferred.as_ref(), derived.as_ref()]
        .into_iter()
        .flatten()
        .collect();

    let mut out = Vec::new();
    for n in 0..=opts.suffix_limit {
        let suffix = if n == 0 { String::new() } else { n.to_string() };
        for base in &bases {
            if let Some(candidate) = build_candidate(base, &suffix, opts) {
                out.push(candidate);
            }
        }
    }
    out
}

/// `possibleGroupnames`: `{owner}-{name}`, same suffix/length rules.
#[must_use]
pub fn possible_groupnames(owner: &str, name: &str, opts: &NameOptions) -> Vec<String> {
    let base = transliterate_alnum_hyphen(&format!("{owner}-{name}"));
    (0..=opts.suffix_limit)
        .filter_map(|n| {
            let suffix = if n == 0 { String::new() } else { n.to_string() };
            build_candidate(&base, &suffix, opts)
        })
        .collect()
}

/// Crockford-ish base-32 alphabet (digits then lowercase, ambiguous glyphs
/// `i l o u` excluded) used to encode a *quint* from a uid/gid.
const QUINT_ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Encode `n` as a quint. The synthesized name this feeds
/// (`user-<quint>`/`group-<quint>`) always starts with a letter regardless
/// of the quint's own first digit, satisfying the login-name invariant.
#[must_use]
pub fn encode_quint(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(QUINT_ALPHABET[(n % 32) as usize]);
        n /= 32;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Draw up to 100 candidates uniformly from `[min, max)`.
fn draw_numeric_candidates(min: u32, max: u32, rng: &mut impl Rng) -> Vec<u32> {
    (0..100).map(|_| rng.random_range(min..max)).collect()
}

/// Reserve the first uid in `[min, max)` that is free in both `reserved`
/// and `ns`. Fails with `Uid`/`Gid` (the caller chooses which) once the
/// draw is exhausted.
pub fn allocate_numeric(
    min: u32,
    max: u32,
    reserved: &std::sync::Arc<ReservationSet<u32>>,
    ns: &dyn NameService,
    is_free: impl Fn(&dyn NameService, u32) -> bool,
    rng: &mut impl Rng,
) -> Option<ReservationGuard<u32>> {
    for candidate in draw_numeric_candidates(min, max, rng) {
        if !is_free(ns, candidate) {
            continue;
        }
        if let Some(guard) = reserved.try_reserve(candidate) {
            return Some(guard);
        }
    }
    None
}

/// Reserve the first name in `candidates` that is free in both `reserved`
/// and `ns`. Fails once the sequence is exhausted.
pub fn allocate_name(
    candidates: Vec<String>,
    reserved: &std::sync::Arc<ReservationSet<String>>,
    ns: &dyn NameService,
    is_free: impl Fn(&dyn NameService, &str) -> bool,
) -> Option<ReservationGuard<String>> {
    for candidate in candidates {
        if !is_free(ns, &candidate) {
            continue;
        }
        if let Some(guard) = reserved.try_reserve(candidate) {
            return Some(guard);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_then_derived_interleaved_with_suffixes() {
        let req = UserRequest {
            username: Some("foobar".into()),
            first_name: Some("foo".into()),
            last_name: Some("bar".into()),
            ..Default::default()
        };
        let names = possible_usernames(&req, &NameOptions::default());
        assert_eq!(
            &names[0..4],
            &["foobar", "fbar", "foobar1", "fbar1"].map(str::to_string)
        );
    }

    #[test]
    fn missing_preferred_falls_back_to_derived_only() {
        let req = UserRequest {
            first_name: Some("Joe".into()),
            last_name: Some("User".into()),
            ..Default::default()
        };
        let names = possible_usernames(&req, &NameOptions::default());
        assert_eq!(names[0], "juser");
        assert_eq!(names[1], "juser1");
    }

    #[test]
    fn truncation_reserves_room_for_the_suffix() {
        let req = UserRequest {
            username: Some("veryverylongusernamerequested".into()),
            first_name: Some("MyLongFirstName".into()),
            last_name: Some("MyLongLastName".into()),
            ..Default::default()
        };
        let opts = NameOptions {
            maxlen: 10,
            ..Default::default()
        };
        let names = possible_usernames(&req, &opts);
        assert_eq!(
            &names[0..4],
            &["veryverylo", "mmylonglas", "veryveryl1", "mmylongla1"].map(str::to_string)
        );
    }

    #[test]
    fn preferred_starting_with_a_digit_is_rejected() {
        let req = UserRequest {
            username: Some("0123456789".into()),
            first_name: Some("Joe".into()),
            last_name: Some("User".into()),
            ..Default::default()
        };
        let opts = NameOptions {
            maxlen: 10,
            ..Default::default()
        };
        let names = possible_usernames(&req, &opts);
        assert_eq!(names[0], "juser");
    }

    #[test]
    fn groupnames_join_owner_and_name() {
        let names = possible_groupnames("alice", "labshare", &NameOptions::default());
        assert_eq!(names[0], "alice-labshare");
        assert_eq!(names[1], "alice-labshare1");
    }

    #[test]
    fn non_latin_names_transliterate_before_deriving_a_candidate() {
        let req = UserRequest {
            first_name: Some("هنا".into()),
            last_name: Some("لطيف".into()),
            ..Default::default()
        };
        let names = possible_usernames(&req, &NameOptions::default());
        assert_eq!(&names[0..2], &["hltyf", "hltyf1"].map(str::to_string));
    }

    #[test]
    fn quint_round_trips_through_a_stable_alphabet() {
        assert_eq!(encode_quint(0), "0");
        assert_ne!(encode_quint(1000), encode_quint(1001));
        assert!(encode_quint(70000).chars().all(|c| QUINT_ALPHABET.contains(&(c as u8))));
    }

    proptest::proptest! {
        /// Every candidate, whatever arbitrary Unicode the request carries,
        /// stays within `NameOptions`'s length bounds, is plain ASCII
        /// `[a-z0-9]`, and never starts with a digit.
        #[test]
        fn every_username_candidate_honors_its_invariants(
            username in "\\PC{0,40}",
            first in "\\PC{0,40}",
            last in "\\PC{0,40}",
        ) {
            let req = UserRequest {
                username: (!username.is_empty()).then_some(username),
                first_name: (!first.is_empty()).then_some(first),
                last_name: (!last.is_empty()).then_some(last),
                ..Default::default()
            };
            let opts = NameOptions::default();
            for candidate in possible_usernames(&req, &opts) {
                prop_assert!(candidate.len() >= opts.minlen);
                prop_assert!(candidate.len() <= opts.maxlen);
                prop_assert!(candidate.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
                prop_assert!(!candidate.starts_with(|c: char| c.is_ascii_digit()));
            }
        }

        /// Same invariants for group-name candidates, plus the literal
        /// hyphen the owner/name join is allowed to introduce.
        #[test]
        fn every_groupname_candidate_honors_its_invariants(
            owner in "\\PC{1,20}",
            name in "\\PC{1,20}",
        ) {
            let opts = NameOptions::default();
            for candidate in possible_groupnames(&owner, &name, &opts) {
                prop_assert!(candidate.len() >= opts.minlen);
                prop_assert!(candidate.len() <= opts.maxlen);
                prop_assert!(candidate
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
                prop_assert!(!candidate.starts_with(|c: char| c.is_ascii_digit()));
            }
        }
    }
}
