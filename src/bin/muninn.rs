//! muninn: code-completion gateway CLI
//!
//! Runs completions against a locally assembled engine and manages
//! credentials, using the same configuration files as an embedding service.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use muninn::{AccessControl, CompletionRequestBuilder, Config, Muninn, Secrets};

/// Muninn CLI
#[derive(Parser)]
#[command(name = "muninn")]
#[command(version = muninn::version::PKG_VERSION)]
#[command(about = "Muninn code-completion gateway")]
struct Args {
    /// Config file (default: ~/.muninn/config.toml, then /etc/muninn/config.toml)
    #[arg(short, long, env = "MUNINN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Complete code from a JSON request
    Complete {
        /// Request file (or omit to read from stdin)
        file: Option<PathBuf>,
    },

    /// Issue an access token
    IssueToken {
        /// Subject identity
        subject: String,
        /// Role to grant (repeatable)
        #[arg(short, long = "role")]
        roles: Vec<String>,
        /// Lifetime in minutes (default: from config)
        #[arg(short, long)]
        minutes: Option<u64>,
    },

    /// Verify an access token and print its claims
    VerifyToken {
        token: String,
    },

    /// Issue an API key valid for 24 hours
    IssueKey {
        /// Identity the key is issued to
        identity: String,
    },

    /// Verify an API key and print its identity
    VerifyKey {
        key: String,
    },

    /// Print engine metrics
    Metrics,

    /// Print version with build metadata
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Command::Version = args.command {
        println!("{}", muninn::version::build_report());
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    match args.command {
        Command::Complete { file } => {
            let input = read_input(file)?;
            let builder: CompletionRequestBuilder = serde_json::from_str(&input)
                .map_err(|e| format!("complete: invalid request JSON: {e}"))?;
            let engine = Muninn::from_config(&config, &secrets)?.build()?;
            let request = engine.request(builder)?;
            let result = engine.complete(&request).await;
            println!("{}", serde_json::to_string_pretty(&*result)?);
        }

        Command::Metrics => {
            let engine = Muninn::from_config(&config, &secrets)?.build()?;
            println!("{}", serde_json::to_string_pretty(&engine.get_metrics().await)?);
        }

        Command::IssueToken {
            subject,
            roles,
            minutes,
        } => {
            let access = AccessControl::from_config(&config.auth, &config.rate_limits, &secrets)?;
            let lifetime = minutes.map(|m| Duration::from_secs(m * 60));
            println!("{}", access.issue_token(&subject, roles, lifetime)?);
        }

        Command::VerifyToken { token } => {
            let access = AccessControl::from_config(&config.auth, &config.rate_limits, &secrets)?;
            let claims = access.verify_token(&token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }

        Command::IssueKey { identity } => {
            let access = AccessControl::from_config(&config.auth, &config.rate_limits, &secrets)?;
            println!("{}", access.issue_api_key(&identity)?);
        }

        Command::VerifyKey { key } => {
            let access = AccessControl::from_config(&config.auth, &config.rate_limits, &secrets)?;
            println!("{}", access.verify_api_key(&key)?);
        }

        Command::Version => unreachable!("handled above"),
    }

    Ok(())
}

/// Read the request body from `file`, or from stdin when piped.
fn read_input(file: Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(&path)
            .map_err(|e| format!("complete: cannot read {}: {e}", path.display()))?);
    }
    if io::stdin().is_terminal() {
        return Err("complete: no input provided (pass a file or pipe JSON via stdin)".into());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
