//! Syntactic validation of sign-in input.
//!
//! These checks run before any credential-service attempt so malformed
//! input fails fast and is never retried.

use crate::constants::MIN_PASSWORD_LEN;
use crate::error::AuthError;

/// Check that `email` has the shape `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidEmail);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(AuthError::InvalidEmail);
    }

    // The domain needs at least one dot with a label on each side.
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return Err(AuthError::InvalidEmail);
    };
    if host.is_empty() || tld.is_empty() || host.starts_with('.') {
        return Err(AuthError::InvalidEmail);
    }

    Ok(())
}

/// Check the minimum password length.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        for email in ["user@example.com", "a.b@mail.co", "x@sub.domain.org"] {
            assert!(validate_email(email).is_ok(), "{email} should validate");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "bad-email",
            "",
            "@example.com",
            "user@",
            "user@domain",
            "user@.com",
            "us er@example.com",
            "user@ex@ample.com",
        ] {
            assert_eq!(
                validate_email(email),
                Err(AuthError::InvalidEmail),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_short_passwords() {
        assert_eq!(validate_password("12345"), Err(AuthError::PasswordTooShort));
        assert!(validate_password("123456").is_ok());
    }
}
