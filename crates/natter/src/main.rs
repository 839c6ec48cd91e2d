mod commands;
mod console;
mod netrc;
mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use natter_client::{ClientConfig, Session};

/// Console client for the Convore group-chat service.
#[derive(Parser)]
#[command(name = "natter", version)]
struct Cli {
    /// Debug-level logging
    #[arg(long)]
    debug: bool,

    /// Ring the terminal bell when a live message arrives
    #[arg(long)]
    notify: bool,

    /// API base URL
    #[arg(long, env = "NATTER_API_BASE", default_value = "https://convore.com")]
    api_base: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(1);
        }
        // --help / --version
        Err(err) => {
            let _ = err.print();
            return Ok(());
        }
    };

    // Init logging on stderr so it interleaves cleanly with the console
    let default_filter = if cli.debug {
        "natter=debug,natter_client=debug"
    } else {
        "natter=info,natter_client=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = ClientConfig {
        api_base: cli.api_base,
        ..ClientConfig::default()
    };

    // Credentials come from ~/.netrc; missing ones are fatal at startup
    let netrc_path = netrc::default_path().context("cannot locate a home directory for ~/.netrc")?;
    let host = netrc::host_of(&config.api_base);
    let credentials = netrc::lookup(&netrc_path, host)
        .with_context(|| format!("reading credentials from {}", netrc_path.display()))?
        .with_context(|| format!("no credentials for {host} in {}", netrc_path.display()))?;

    let session = Arc::new(Session::start(&config, Some(&credentials))?);
    let result = console::run(
        session.clone(),
        console::ConsoleOptions { notify: cli.notify },
    )
    .await;
    session.close().await;
    result
}
