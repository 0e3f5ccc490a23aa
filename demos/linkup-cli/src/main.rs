//! Social Linkup CLI
//!
//! Log in to LinkedIn and X/Twitter and post the same message to both.
//!
//! Provider client credentials are read from the credentials document
//! (default: `<config dir>/social-linkup/credentials.json`), and tokens are
//! kept in `<config dir>/social-linkup/credentials.store.json`.
//!
//! Run with:
//!   cargo run -p linkup-cli -- login twitter
//!   cargo run -p linkup-cli -- post "Hello from the terminal"
//!   cargo run -p linkup-cli -- status

mod consent;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use social_linkup::{
    CredentialVault, FileCredentialSource, FileStore, LinkupConfig, LinkupError, Platform, Session,
};

use crate::consent::TerminalConsent;

/// Post to LinkedIn and X from the terminal
#[derive(Parser, Debug)]
#[command(name = "linkup")]
#[command(about = "Log in to LinkedIn and X/Twitter and post to both at once")]
struct Args {
    /// Provider credentials document (JSON keyed by platform)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Token store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which accounts are logged in
    Status,
    /// Log in to a platform (linkedin, twitter)
    Login {
        /// Platform to log in to
        platform: Platform,
    },
    /// Log out of a platform
    Logout {
        /// Platform to log out of
        platform: Platform,
    },
    /// Post a message to every logged-in platform
    Post {
        /// Message text
        text: String,
    },
}

async fn build_session(args: &Args) -> anyhow::Result<Session> {
    let source = match &args.credentials {
        Some(path) => FileCredentialSource::with_path(path.clone()),
        None => FileCredentialSource::new(),
    };
    let store = match &args.store {
        Some(path) => FileStore::with_path(path.clone()),
        None => FileStore::new(),
    };

    let session = Session::from_source(
        &source,
        &LinkupConfig::default(),
        CredentialVault::new(Arc::new(store)),
        Arc::new(TerminalConsent),
    )
    .await?;
    session.restore()?;
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Quiet by default, override with RUST_LOG
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "social_linkup=info,linkup_cli=info,warn".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    output::display_greeting();
    let session = build_session(&args).await?;

    match &args.command {
        Command::Status => output::display_status(&session),
        Command::Login { platform } => match session.login(*platform).await {
            Ok(credential) => {
                let who = credential.username.as_deref().unwrap_or("unknown user");
                output::display_success(&format!("Logged in to {platform} as {who}"));
            }
            Err(LinkupError::ConsentCancelled) => output::display_warning("Login cancelled"),
            Err(e) => {
                output::display_error(&format!("Login failed: {e}"));
                std::process::exit(1);
            }
        },
        Command::Logout { platform } => {
            session.logout(*platform)?;
            output::display_success(&format!("Logged out of {platform}"));
        }
        Command::Post { text } => {
            let spinner = tokio::spawn(output::follow_loading(session.subscribe()));
            let report = session.post_to_all(text).await;
            drop(session);
            // The status sender is gone, so the spinner task winds down.
            let _ = spinner.await;

            let report = report?;
            output::display_report(&report);
            if !report.all_succeeded() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
