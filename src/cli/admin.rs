//! Administration command handlers
//!
//! Every admin command first passes the `admin` access check; accounts
//! without the role are told the command is not available.

use crate::cli::{
    AccessModeCommands, AdminCommands, CommandContext, GlobalOptions, ListCommands, UserCommands,
    prompt,
};
use crate::client::models::{CreateUserRequest, ListEntryRequest, UpdateUserRequest};
use crate::client::{AccessList, AdminApi};
use crate::error::{Error, Result};
use crate::models::{AccessModeDisplay, EntryDisplay, MessageDisplay, UserDisplay};
use crate::output::{Formattable, spinner};
use crate::session::{RouteGuard, routes};
use crate::validation;

/// Resource name the portal checks for administration
pub const ADMIN_RESOURCE: &str = "admin";

pub async fn run(opts: &GlobalOptions, command: AdminCommands) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::ADMIN)?;
    ctx.enter(RouteGuard::Authorized(ADMIN_RESOURCE.to_string()), routes::ADMIN)
        .await?;

    match command {
        AdminCommands::Verify => verify(&ctx).await,
        AdminCommands::Users(command) => users(&ctx, command).await,
        AdminCommands::Whitelist(command) => entries(&ctx, AccessList::Whitelist, command).await,
        AdminCommands::Blacklist(command) => entries(&ctx, AccessList::Blacklist, command).await,
        AdminCommands::AccessMode(command) => access_mode(&ctx, command).await,
    }
}

async fn verify(ctx: &CommandContext) -> Result<()> {
    if ctx.client().verify_admin().await? {
        MessageDisplay::success("You have administrator access").print(ctx.format)
    } else {
        Err(Error::Auth(
            "This command is not available for your account.".to_string(),
        ))
    }
}

async fn users(ctx: &CommandContext, command: UserCommands) -> Result<()> {
    let client = ctx.client();

    match command {
        UserCommands::List => {
            let progress = spinner(ctx.format, "Loading users...");
            let users = client.list_users().await;
            progress.finish_and_clear();

            let rows: Vec<UserDisplay> = users?.into_iter().map(UserDisplay::from).collect();
            log::debug!("Listed {} users", rows.len());
            rows.print(ctx.format)
        }
        UserCommands::Create {
            email,
            name,
            role,
            password,
        } => {
            let email = email.trim().to_string();
            validation::email(&email)?;
            let password = prompt::new_password(password.password, "Password for the new user")?;

            let request = CreateUserRequest {
                email,
                password,
                name,
                role,
            };
            let user = client.create_user(&request).await?;
            vec![UserDisplay::from(user)].print(ctx.format)
        }
        UserCommands::Update {
            id,
            name,
            role,
            verified,
        } => {
            let request = UpdateUserRequest {
                name,
                role,
                verified,
            };
            if request.is_empty() {
                return Err(Error::Validation(
                    "Nothing to update. Pass --name, --role or --verified.".to_string(),
                ));
            }

            let user = client.update_user(&id, &request).await?;
            vec![UserDisplay::from(user)].print(ctx.format)
        }
        UserCommands::Delete { id, yes } => {
            if !yes && !prompt::confirm(&format!("Delete user {}?", id))? {
                return MessageDisplay::success("Nothing deleted").print(ctx.format);
            }

            client.delete_user(&id).await?;
            MessageDisplay::success(format!("Deleted user {}", id)).print(ctx.format)
        }
    }
}

async fn entries(ctx: &CommandContext, list: AccessList, command: ListCommands) -> Result<()> {
    let client = ctx.client();

    match command {
        ListCommands::List => {
            let entries = client.list_entries(list).await?;
            let rows: Vec<EntryDisplay> = entries.into_iter().map(EntryDisplay::from).collect();
            rows.print(ctx.format)
        }
        ListCommands::Add { email, reason } => {
            let email = email.trim().to_string();
            if !email.contains('@') {
                return Err(Error::Validation(format!(
                    "'{}' is not an email address or domain pattern",
                    email
                )));
            }

            let request = ListEntryRequest {
                email,
                reason: reason.filter(|r| !r.trim().is_empty()),
            };
            let entry = client.add_entry(list, &request).await?;
            vec![EntryDisplay::from(entry)].print(ctx.format)
        }
        ListCommands::Remove { id } => {
            client.remove_entry(list, &id).await?;
            MessageDisplay::success(format!("Removed {} from the {}", id, list)).print(ctx.format)
        }
    }
}

async fn access_mode(ctx: &CommandContext, command: AccessModeCommands) -> Result<()> {
    let mode = match command {
        AccessModeCommands::Get => ctx.client().get_access_mode().await?,
        AccessModeCommands::Set { mode } => ctx.client().set_access_mode(mode).await?,
    };
    AccessModeDisplay { mode }.print(ctx.format)
}
