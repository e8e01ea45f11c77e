#![no_main]

use libfuzzer_sys::fuzz_target;
use usermgr_directory::escape_filter_value;

fuzz_target!(|data: &str| {
    let escaped = escape_filter_value(data);
    // A raw occurrence of any of these means a request body could break
    // out of the filter syntax it's interpolated into. `\` is exempt: the
    // escaper's own `\XX` sequences legitimately introduce one.
    for c in ['(', ')', '*', '\0'] {
        assert!(!escaped.contains(c), "unescaped {c:?} survived: {escaped:?}");
    }
});
