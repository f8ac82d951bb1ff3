use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use heartline::api::Api;
use heartline::flow;
use heartline::session::Session;

#[derive(Parser)]
#[command(name = "heartline", about = "Terminal client for the heartline matching service")]
struct Cli {
    /// REST backend base URL
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Live-channel endpoint
    #[arg(long, default_value = "ws://localhost:3007")]
    channel: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Sign in and remember the session
    Signin {
        #[arg(short, long)]
        username: String,
    },
    /// Forget the remembered session
    Signout,
    /// Show your profile
    Profile,
    /// Fill in the matching survey
    Survey,
    /// Wait for a match and chat
    Match {
        /// Give up waiting after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Signup { username, name } => {
            flow::signup(&Api::new(&cli.server), &username, &name).await
        }
        Commands::Signin { username } => {
            flow::signin(&Api::new(&cli.server), &username).await?;
            Ok(())
        }
        Commands::Signout => flow::signout(),
        Commands::Profile => flow::profile(&signed_in_api(&cli.server)?).await,
        Commands::Survey => flow::survey(&signed_in_api(&cli.server)?).await,
        Commands::Match { timeout_secs } => {
            let api = signed_in_api(&cli.server)?;
            let timeout = timeout_secs.map(Duration::from_secs);
            flow::run_match(&api, &cli.channel, timeout).await
        }
    }
}

fn signed_in_api(server: &str) -> Result<Api> {
    let session = Session::load().context("not signed in; run `heartline signin` first")?;
    Ok(Api::new(server).with_session(session.sessid))
}
