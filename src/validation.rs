//! Client-side input validation
//!
//! These checks run before anything is sent. Failures are
//! [`Error::Validation`] and are reported to the user, never logged.

use crate::error::{Error, Result};

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Check that `email` looks like `local@domain.tld`.
pub fn email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::Validation(
            "Please enter a valid email address.".to_string(),
        ))
    }
}

/// Check password strength: length, a letter and a digit.
pub fn password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(Error::Validation(
            "Password must contain at least one letter and one number.".to_string(),
        ));
    }
    Ok(())
}

/// Check that a password and its confirmation match.
pub fn confirmation(password: &str, confirm: &str) -> Result<()> {
    if password == confirm {
        Ok(())
    } else {
        Err(Error::Validation("Passwords do not match.".to_string()))
    }
}

/// Check that an emailed token (verification, reset) was supplied.
pub fn token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        Err(Error::Validation(
            "The link is missing its token. Please use the link from your email.".to_string(),
        ))
    } else {
        Ok(())
    }
}
