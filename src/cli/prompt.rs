//! Interactive prompts for values not given on the command line

use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};

use crate::error::Result;
use crate::validation;

/// Use `given` or prompt for an email address; validated either way.
pub fn email(given: Option<String>) -> Result<String> {
    let email = match given {
        Some(email) => email,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text()?,
    };
    let email = email.trim().to_string();
    validation::email(&email)?;
    Ok(email)
}

/// Use `given` or prompt for the password of an existing account.
pub fn password(given: Option<String>) -> Result<String> {
    match given {
        Some(password) => Ok(password),
        None => Ok(Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()?),
    }
}

/// Use `given` or prompt twice for a new password; checked against the
/// password rules.
pub fn new_password(given: Option<String>, prompt: &str) -> Result<String> {
    let password = match given {
        Some(password) => password,
        None => {
            let theme = ColorfulTheme::default();
            let first = Password::with_theme(&theme).with_prompt(prompt).interact()?;
            validation::password(&first)?;
            let confirm = Password::with_theme(&theme)
                .with_prompt("Confirm password")
                .interact()?;
            validation::confirmation(&first, &confirm)?;
            first
        }
    };
    validation::password(&password)?;
    Ok(password)
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(question: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(question)
        .default(false)
        .interact()?)
}
