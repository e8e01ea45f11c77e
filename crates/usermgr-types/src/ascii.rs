//! ASCII-stripping helper shared by the allocator and the LDAP attribute
//! writer, ported from `clumsy/usermgrd.py`'s `keepAscii`.

/// Strips everything outside `[0-9a-zA-Z @+-]` from `s`.
///
/// LDAP attributes like `mail` and `gecos` are written through this filter
/// before being sent to the directory, so that downstream parsers (notably
/// `kadmin` and shell tools that treat `gecos` as a `:`-delimited field)
/// never see characters they choke on.
#[must_use]
pub fn keep_ascii(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '@' | '+' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_non_ascii() {
        assert_eq!(keep_ascii("jane.doe@example.com"), "janedoe@examplecom");
        assert_eq!(keep_ascii("Jöhn O'Malley-Smith"), "Jhn OMalley-Smith");
    }

    #[test]
    fn keeps_allowed_characters() {
        assert_eq!(keep_ascii("a-b+c d@e"), "a-b+c d@e");
    }

    #[test]
    fn empty_input() {
        assert_eq!(keep_ascii(""), "");
    }
}
