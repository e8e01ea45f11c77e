#![no_main]

use libfuzzer_sys::fuzz_target;
use usermgr_kerberos::parse_principal_output;

fuzz_target!(|data: &str| {
    // `kadmin get_principal`'s output is adversarial input from the
    // daemon's own child process's stdout; the parser must never panic on
    // truncated lines, stray colons, or non-UTF8-adjacent byte sequences
    // (libfuzzer only gives us `&str`, so only the lossy-decode side is
    // exercised directly, but that's the side that actually parses).
    let _ = parse_principal_output(data);
});
