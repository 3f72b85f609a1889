//! Portal CLI - sign in to the auth portal and manage your session

use clap::Parser;

use portal::cli::{self, Cli, Commands, GlobalOptions, PasswordCommands};
use portal::error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => cli::auth::login(&opts, email, password, remember).await,
        Commands::Logout => cli::auth::logout(&opts).await,
        Commands::Status => cli::status::run(&opts).await,
        Commands::Register {
            email,
            name,
            password,
        } => cli::auth::register(&opts, email, name, password).await,
        Commands::Verify { token } => cli::auth::verify(&opts, &token).await,
        Commands::ResendVerification { email } => {
            cli::auth::resend_verification(&opts, email).await
        }
        Commands::Password(command) => match command {
            PasswordCommands::Forgot { email } => cli::auth::forgot_password(&opts, email).await,
            PasswordCommands::Reset { token, password } => {
                cli::auth::reset_password(&opts, &token, password).await
            }
        },
        Commands::Profile(command) => cli::profile::run(&opts, command).await,
        Commands::Admin(command) => cli::admin::run(&opts, command).await,
        Commands::Oauth { callback_url } => cli::auth::oauth(&opts, &callback_url).await,
        Commands::Watch => cli::watch::run(&opts).await,
        Commands::Completion { shell } => cli::completions::run(shell),
    }
}

