#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use usermgr_core::allocator::{encode_quint, possible_groupnames, possible_usernames, NameOptions};
use usermgr_types::model::UserRequest;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let request = UserRequest {
        first_name: u.arbitrary().unwrap_or(None),
        last_name: u.arbitrary().unwrap_or(None),
        username: u.arbitrary().unwrap_or(None),
        ..UserRequest::default()
    };
    let opts = NameOptions::default();

    if let Ok(n) = u.arbitrary::<u32>() {
        let quint = encode_quint(n);
        assert!(!quint.is_empty());
        assert!(quint.is_ascii());
    }

    // Transliteration/truncation must never panic, and every candidate
    // produced must respect the length bounds it was asked to honor —
    // arbitrary Unicode input (combining marks, RTL scripts, emoji) is
    // exactly what `deunicode` and the truncation logic have to survive.
    for candidate in possible_usernames(&request, &opts) {
        assert!(candidate.len() >= opts.minlen);
        assert!(candidate.len() <= opts.maxlen);
        assert!(candidate.is_ascii());
    }

    let owner = request.username.clone().unwrap_or_default();
    let group_hint = request.last_name.clone().unwrap_or_default();
    for candidate in possible_groupnames(&owner, &group_hint, &opts) {
        assert!(candidate.len() <= opts.maxlen);
        assert!(candidate.is_ascii());
    }
});
