use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const MIN_PASSWORD_LEN: usize = 12;

/// Password policy: at least 12 characters with one lowercase, one uppercase,
/// one digit, and one special character. Every violated rule is reported, not
/// just the first one.
pub(crate) fn password_violations(password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError {
            field: "password",
            message: format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            ),
        });
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(FieldError {
            field: "password",
            message: "Password must include a lowercase character".into(),
        });
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(FieldError {
            field: "password",
            message: "Password must include an uppercase character".into(),
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError {
            field: "password",
            message: "Password must include a number".into(),
        });
    }
    // Anything outside [a-zA-Z0-9] counts, including non-ASCII letters.
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        errors.push(FieldError {
            field: "password",
            message: "Password must include a special character".into(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn strong_password_at_exact_minimum_passes() {
        // 12 characters, all four classes present.
        assert!(password_violations("Abcdef1!2345").is_empty());
    }

    #[test]
    fn short_password_is_flagged() {
        let errors = password_violations("Ab1!");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("at least 12 characters")));
    }

    #[test]
    fn missing_classes_are_all_enumerated() {
        let errors = password_violations("abc");
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("at least 12")));
        assert!(messages.iter().any(|m| m.contains("uppercase")));
        assert!(messages.iter().any(|m| m.contains("number")));
        assert!(messages.iter().any(|m| m.contains("special")));
        assert!(!messages.iter().any(|m| m.contains("include a lowercase")));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn non_ascii_letter_counts_as_special() {
        // `é` falls outside [a-zA-Z0-9], so it satisfies the special rule.
        assert!(password_violations("Abcdefgh123é").is_empty());
    }

    #[test]
    fn every_field_error_targets_the_password_field() {
        for e in password_violations("") {
            assert_eq!(e.field, "password");
        }
    }
}
