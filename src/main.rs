use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use healthcare_lookup::{cli, oneshot, server};

fn env_filter(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Before the subscriber, so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("RUST_LOG"))
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let args = cli::Args::parse();

    match args.cmd {
        cli::Command::Serve(cmd) => server::run(cmd)
            .await
            .context("serve failed")
            .map(|()| ExitCode::SUCCESS),
        cli::Command::Medicine(cmd) => oneshot::run_medicine(cmd)
            .await
            .context("medicine lookup failed"),
        cli::Command::Hospitals(cmd) => {
            oneshot::run_hospitals(cmd).context("hospital search failed")
        }
    }
}
