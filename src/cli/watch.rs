//! Watch command handler
//!
//! Keeps one session open and follows the shared store, so sign-ins and
//! sign-outs made by other `portal` processes show up here as they happen.

use chrono::Local;
use colored::Colorize;
use serde_json::json;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::error::Result;
use crate::session::{Navigator, SessionState, routes};

pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let mut ctx = CommandContext::new(opts, routes::PROFILE)?;
    ctx.watch_shared_store();

    let controller = ctx.controller.clone();
    let mut states = controller.session().watch_state();
    let state = controller.start().await;
    let _ = states.borrow_and_update();
    report(&ctx, state)?;

    if opts.format != OutputFormat::Json {
        eprintln!("{}", "Watching for session changes (Ctrl+C to stop)".dimmed());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if state == SessionState::Authenticating {
                    continue;
                }
                report(&ctx, state)?;
                // Refreshes rotate cookies; keep the config current for
                // commands started meanwhile.
                ctx.persist()?;
            }
        }
    }

    controller.stop();
    Ok(())
}

fn report(ctx: &CommandContext, state: SessionState) -> Result<()> {
    let now = Local::now();
    let location = ctx.navigator.current();

    match ctx.format {
        OutputFormat::Json => {
            let line = json!({
                "at": now.to_rfc3339(),
                "state": state.to_string(),
                "location": location,
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        OutputFormat::Table => println!("{}\t{}\t{}", now.format("%H:%M:%S"), state, location),
        OutputFormat::Pretty => {
            let label = match state {
                SessionState::Authenticated => "signed in".green(),
                SessionState::Unauthenticated => "signed out".red(),
                SessionState::Authenticating => "checking".yellow(),
            };
            let mut line = format!("[{}] {}", now.format("%H:%M:%S"), label);
            if ctx.navigator.is_on(routes::LOGIN) {
                line.push_str(&format!(" {}", "(run 'portal login' to sign in again)".dimmed()));
            }
            println!("{}", line);
        }
    }
    Ok(())
}
