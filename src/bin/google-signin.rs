//! Terminal front-end for Google sign-in.
//!
//! Shows the sign-in prompt, runs the loopback authorization flow, then keeps
//! the profile screen up and reacts to `refresh`, `sign-out` and `quit`.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use google_signin::{
    AuthClient, AuthController, AuthState, ClientCredentials, LoopbackProvider, OAuthConfig,
    Platform, PlatformStore, Screen, TerminalNotifier,
};

#[derive(Debug, Parser)]
#[command(name = "google-signin", version, about = "Sign in with Google from the terminal")]
struct Args {
    /// Client platform whose OAuth client to use (web, ios, android).
    #[arg(long, env = "GOOGLE_SIGNIN_PLATFORM")]
    platform: Option<Platform>,

    /// Directory for local refresh-token storage (web platform).
    #[arg(long, env = "GOOGLE_SIGNIN_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Override GOOGLE_REDIRECT_URI.
    #[arg(long)]
    redirect_uri: Option<Url>,

    /// Seconds to wait for the authorization redirect.
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Refresh silently with the persisted token, render, and exit.
    #[arg(long)]
    refresh_only: bool,
}

enum Command {
    SignIn,
    Refresh,
    SignOut,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str, state: AuthState) -> Self {
        match line.trim() {
            "" if state == AuthState::SignedOut => Self::SignIn,
            "sign-in" | "signin" => Self::SignIn,
            "refresh" | "r" => Self::Refresh,
            "sign-out" | "signout" | "s" => Self::SignOut,
            "quit" | "q" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("google_signin=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_store_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".google-signin")
}

fn print_authorization_url(url: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "\nOpen this URL in your browser to continue:\n\n  {url}\n")?;
    stdout.flush()
}

fn prompt(state: AuthState) {
    let hint = if state == AuthState::SignedIn {
        "refresh | sign-out | quit"
    } else {
        "press Enter to sign in | quit"
    };
    print!("{hint}> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let platform = args.platform.unwrap_or_else(Platform::current);
    let mut config = OAuthConfig::from_env().context("loading OAuth configuration")?;
    if let Some(uri) = args.redirect_uri {
        config = config.with_redirect_uri(uri);
    }
    let profile = ClientCredentials::from_env()
        .resolve(platform)
        .context("resolving client credentials")?;
    let store = PlatformStore::for_platform(
        platform,
        args.store_dir.unwrap_or_else(default_store_dir),
    )?;
    tracing::info!(%platform, store = store.name(), "Configured Google sign-in");

    let provider = LoopbackProvider::new(config.redirect_uri().clone(), print_authorization_url)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let client = AuthClient::new(config.clone());
    let mut controller =
        AuthController::new(config, profile, provider, client, store, TerminalNotifier);
    controller.prepare_request();

    if args.refresh_only {
        controller.refresh_access_token().await?;
        println!("{}", Screen::project(&controller));
        return Ok(());
    }

    println!("{}", Screen::project(&controller));
    prompt(controller.state());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line, controller.state()) {
            Command::SignIn if controller.user_info().is_some() => {
                println!("Already signed in.");
            }
            Command::SignIn => {
                if let Err(e) = controller.sign_in().await {
                    tracing::debug!(error = %e, "Sign-in did not complete");
                }
            }
            Command::Refresh => {
                if let Err(e) = controller.refresh_access_token().await {
                    tracing::debug!(error = %e, "Refresh did not complete");
                }
            }
            Command::SignOut => {
                if let Err(e) = controller.sign_out().await {
                    tracing::debug!(error = %e, "Sign-out did not complete cleanly");
                }
            }
            Command::Quit => break,
            Command::Unknown(other) => println!("Unknown command: {other}"),
        }
        println!("\n{}", Screen::project(&controller));
        prompt(controller.state());
    }

    Ok(())
}
