//! RFC 2254 §4 / RFC 4514 §2.4 search-filter escaping.

/// Escapes `value` for safe interpolation into an LDAP search filter.
///
/// Escapes the RFC 2254-mandated characters (`( ) * \ NUL`) plus the
/// RFC 4514 safety characters (`" # + , ; < > = |` and space), each as a
/// `\XX` hex pair. `ldap3::ldap_escape` only covers the mandated set; this
/// also covers the characters that matter for defending against filter
/// injection from request bodies.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '*' => out.push_str("\\2a"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            '"' => out.push_str("\\22"),
            '#' => out.push_str("\\23"),
            '+' => out.push_str("\\2b"),
            ',' => out.push_str("\\2c"),
            ';' => out.push_str("\\3b"),
            '=' => out.push_str("\\3d"),
            '<' => out.push_str("\\3c"),
            '>' => out.push_str("\\3e"),
            '|' => out.push_str("\\7c"),
            ' ' => out.push_str("\\20"),
            x => out.push(x),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_mandated_characters() {
        assert_eq!(escape_filter_value("a(b)c*d\\e"), "a\\28b\\29c\\2ad\\5ce");
    }

    #[test]
    fn escapes_safety_characters() {
        assert_eq!(escape_filter_value("a,b;c"), "a\\2cb\\3bc");
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        assert_eq!(escape_filter_value("jdoe123"), "jdoe123");
    }

    #[test]
    fn injection_attempt_is_neutralized() {
        let payload = "*)(uid=*))(|(uid=*";
        let escaped = escape_filter_value(payload);
        assert!(!escaped.contains('('));
        assert!(!escaped.contains(')'));
        assert!(!escaped.contains('*'));
    }
}
