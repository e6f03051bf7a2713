//! mrrdash - command-line client for the MRR analytics dashboard.
//!
//! Signs in against the dashboard API, keeps the session token in the
//! configured store, and reports when the token runs out.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mrrdash_core::{
    store, AnalyticsSelection, AuthClient, Clock, Config, Credentials, SessionManager, SystemClock,
};

const USAGE: &str = "\
Usage: mrrdash <command>

Commands:
  login [email]    Sign in and store the session token
  signup [email]   Create an account and sign in
  logout           Forget the stored session
  status           Show the stored session
  wait             Block until the stored session expires

Environment:
  MRRDASH_BASE_URL   Dashboard URL (default http://localhost:8080)
  MRRDASH_STORE      Token store: file, keyring or memory
  RUST_LOG           Log filter, e.g. RUST_LOG=debug";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut config = Config::load()?;
    let manager = build_manager(&config)?;

    match command {
        "login" | "signup" => {
            let email = match args.get(1) {
                Some(email) => email.clone(),
                None => prompt_email(config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")
                .context("Failed to read password")?;

            let credentials = if command == "login" {
                Credentials::login(&email, password)
            } else {
                Credentials::signup(&email, password)
            };

            manager.authenticate(&credentials).await?;
            print_status(&manager).await;

            config.last_email = Some(email);
            config.save()?;
        }
        "logout" => {
            manager.logout().await;
            println!("Logged out");
        }
        "status" => {
            manager.restore().await;
            print_status(&manager).await;
        }
        "wait" => {
            let status = manager.restore().await;
            if !status.is_authenticated() {
                println!("Not logged in");
                return Ok(());
            }
            print_status(&manager).await;

            let mut rx = manager.subscribe();
            rx.wait_for(|s| !s.is_authenticated())
                .await
                .context("Session manager went away")?;
            if manager.did_auto_logout() {
                println!("Session expired, logged out");
            }
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn build_manager(config: &Config) -> Result<SessionManager> {
    let client = AuthClient::from_config(config)?;
    let store = store::open(config)?;
    info!(base_url = %client.base_url(), store = ?config.store, "Using dashboard");

    Ok(SessionManager::builder(Arc::new(client), store)
        .observer(Arc::new(AnalyticsSelection::new()))
        .purge_stale_sessions(config.purge_stale_sessions)
        .build())
}

fn prompt_email(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = line.trim();

    match (email.is_empty(), default) {
        (false, _) => Ok(email.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => Err(anyhow::anyhow!("An email address is required")),
    }
}

async fn print_status(manager: &SessionManager) {
    match manager.session().await {
        Some(session) => {
            let expiry = session
                .expires_at_utc()
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| session.expires_at.to_string());
            let minutes = session.minutes_until_expiry(SystemClock.now_millis());
            println!(
                "Logged in as {} (expires {}, {}m left)",
                session.user_id, expiry, minutes
            );
        }
        None if manager.did_auto_logout() => println!("Not logged in (session expired)"),
        None => println!("Not logged in"),
    }
}
