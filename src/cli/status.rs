//! Status command handler

use crate::cli::{CommandContext, GlobalOptions};
use crate::client::ProfileApi;
use crate::error::Result;
use crate::models::StatusDisplay;
use crate::output::formatters::format_expiry;
use crate::output::{Formattable, spinner};
use crate::session::{SessionState, routes};

/// Show configuration and whether the saved session can be resumed.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts, routes::HOME)?;

    let progress = spinner(opts.format, "Checking session...");
    let state = ctx.controller.bootstrap().await;

    let mut email = None;
    let mut token_expires_in = None;
    if state == SessionState::Authenticated {
        match ctx.client().get_profile().await {
            Ok(profile) => email = Some(profile.email),
            Err(err) => log::debug!("Could not load profile for status: {}", err),
        }
        token_expires_in = ctx
            .session()
            .tokens()
            .get()
            .await
            .and_then(|token| token.expires_at())
            .map(format_expiry);
    }
    progress.finish_and_clear();

    let display = StatusDisplay {
        config_path: ctx.config_path.display().to_string(),
        api_host: ctx.client().base_url().to_string(),
        language: ctx.client().locale().to_string(),
        state: ctx.controller.state().to_string(),
        email,
        token_expires_in,
        remember_device: ctx.config.remember_device,
        sync: ctx.controller.bus().mechanism().to_string(),
    };
    display.print(opts.format)
}
