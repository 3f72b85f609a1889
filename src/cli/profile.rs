//! Profile command handlers

use crate::cli::{CommandContext, GlobalOptions, ProfileCommands, prompt};
use crate::client::ProfileApi;
use crate::client::models::ProfileUpdate;
use crate::error::{Error, Result};
use crate::models::ProfileDisplay;
use crate::output::{Formattable, spinner};
use crate::session::{RouteGuard, routes};
use crate::validation;

pub async fn run(opts: &GlobalOptions, command: ProfileCommands) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::PROFILE)?;
    ctx.enter(RouteGuard::Authenticated, routes::PROFILE).await?;

    match command {
        ProfileCommands::Show => show(&ctx).await,
        ProfileCommands::Update {
            name,
            email,
            change_password,
        } => update(&ctx, name, email, change_password).await,
    }
}

async fn show(ctx: &CommandContext) -> Result<()> {
    let progress = spinner(ctx.format, "Loading profile...");
    let profile = ctx.client().get_profile().await;
    progress.finish_and_clear();

    ProfileDisplay(profile?).print(ctx.format)
}

async fn update(
    ctx: &CommandContext,
    name: Option<String>,
    email: Option<String>,
    change_password: bool,
) -> Result<()> {
    let mut update = ProfileUpdate {
        name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        ..Default::default()
    };

    if let Some(email) = email {
        let email = email.trim().to_string();
        validation::email(&email)?;
        update.email = Some(email);
    }

    if change_password {
        let current = prompt::password(None)?;
        if current.is_empty() {
            return Err(Error::Validation(
                "Please enter your current password.".to_string(),
            ));
        }
        update.current_password = Some(current);
        update.new_password = Some(prompt::new_password(None, "New password")?);
    }

    if update.is_empty() {
        return Err(Error::Validation(
            "Nothing to update. Pass --name, --email or --change-password.".to_string(),
        ));
    }

    let profile = ctx.client().update_profile(&update).await?;
    ProfileDisplay(profile).print(ctx.format)
}
