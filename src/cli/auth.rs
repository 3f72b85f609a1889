//! Sign-in, sign-out and account recovery commands

use crate::cli::{CommandContext, GlobalOptions, PasswordArgs, prompt};
use crate::client::AuthApi;
use crate::client::models::{RegisterRequest, ResetPasswordRequest};
use crate::error::{Error, Result};
use crate::models::MessageDisplay;
use crate::output::{Formattable, spinner};
use crate::session::{Credentials, RouteGuard, routes};
use crate::validation;

/// Days a device stays remembered when the config does not say
pub const DEFAULT_REMEMBER_DAYS: u32 = 30;

/// Sign in with email and password
pub async fn login(
    opts: &GlobalOptions,
    email: Option<String>,
    password: PasswordArgs,
    remember: bool,
) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::LOGIN)?;
    ctx.enter(RouteGuard::Guest, routes::LOGIN).await?;

    let email = prompt::email(email)?;
    let password = prompt::password(password.password)?;
    if password.is_empty() {
        return Err(Error::Validation("Please enter your password.".to_string()));
    }

    let mut credentials = Credentials::new(email.clone(), password);
    if remember || ctx.config.remember_device {
        credentials =
            credentials.remember(ctx.config.remember_days.unwrap_or(DEFAULT_REMEMBER_DAYS));
    }

    let progress = spinner(opts.format, "Signing in...");
    let result = ctx.controller.login(&credentials).await;
    progress.finish_and_clear();
    result.map_err(|err| Error::Auth(err.user_message()))?;

    MessageDisplay::success(format!("Signed in as {}", email)).print(opts.format)
}

/// Sign out: local state first, then the server
pub async fn logout(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::PROFILE)?;

    let progress = spinner(opts.format, "Signing out...");
    ctx.controller.logout().await;
    progress.finish_and_clear();
    ctx.client().cookies().clear();

    MessageDisplay::success("Signed out").print(opts.format)
}

/// Create an account
pub async fn register(
    opts: &GlobalOptions,
    email: Option<String>,
    name: Option<String>,
    password: PasswordArgs,
) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::REGISTER)?;
    ctx.enter(RouteGuard::Guest, routes::REGISTER).await?;

    let email = prompt::email(email)?;
    let password = prompt::new_password(password.password, "Choose a password")?;

    let request = RegisterRequest {
        email,
        password,
        name: name.filter(|n| !n.trim().is_empty()),
    };
    let message = ctx.client().register(&request).await?;

    MessageDisplay::success(message.unwrap_or_else(|| {
        "Account created. Check your email to verify your address.".to_string()
    }))
    .print(opts.format)
}

/// Confirm an email address
pub async fn verify(opts: &GlobalOptions, token: &str) -> Result<()> {
    validation::token(token)?;
    let ctx = CommandContext::new(opts, routes::VERIFY)?;

    let message = ctx.client().verify_email(token.trim()).await?;
    MessageDisplay::success(
        message.unwrap_or_else(|| "Email verified. You can now sign in.".to_string()),
    )
    .print(opts.format)
}

/// Send the verification email again
pub async fn resend_verification(opts: &GlobalOptions, email: Option<String>) -> Result<()> {
    let email = prompt::email(email)?;
    let ctx = CommandContext::new(opts, routes::VERIFY)?;

    let message = ctx.client().resend_verification(&email).await?;
    MessageDisplay::success(
        message.unwrap_or_else(|| format!("Verification email sent to {}", email)),
    )
    .print(opts.format)
}

/// Email a password reset link
pub async fn forgot_password(opts: &GlobalOptions, email: Option<String>) -> Result<()> {
    let email = prompt::email(email)?;
    let ctx = CommandContext::new(opts, routes::RESET_PASSWORD)?;

    ctx.client().forgot_password(&email).await?;
    // Same answer whether or not the account exists
    MessageDisplay::success(format!(
        "If an account exists for {}, a reset link is on its way.",
        email
    ))
    .print(opts.format)
}

/// Set a new password with an emailed reset token
pub async fn reset_password(opts: &GlobalOptions, token: &str, password: PasswordArgs) -> Result<()> {
    validation::token(token)?;
    let password = prompt::new_password(password.password, "New password")?;
    let ctx = CommandContext::new(opts, routes::RESET_PASSWORD)?;

    let request = ResetPasswordRequest {
        token: token.trim().to_string(),
        new_password: password,
    };
    let message = ctx.client().reset_password(&request).await?;
    MessageDisplay::success(
        message.unwrap_or_else(|| "Password updated. You can now sign in.".to_string()),
    )
    .print(opts.format)
}

/// Finish an OAuth sign-in
pub async fn oauth(opts: &GlobalOptions, callback_url: &str) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::OAUTH_CALLBACK)?;
    ctx.controller.complete_oauth(callback_url).await?;
    MessageDisplay::success("Signed in").print(opts.format)
}
