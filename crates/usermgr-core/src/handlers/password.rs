//! One-shot password generation for newly provisioned Kerberos principals.

use rand::distr::{Alphanumeric, SampleString};

const PASSWORD_LEN: usize = 32;

/// A fresh 32-character alphanumeric password. Never logged; returned to
/// the caller exactly once.
pub fn generate() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), PASSWORD_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_32_ascii_alphanumeric_chars() {
        let p = generate();
        assert_eq!(p.len(), PASSWORD_LEN);
        assert!(p.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn two_passwords_are_not_the_same() {
        assert_ne!(generate(), generate());
    }
}
