//! EstateDesk command-line client.

#![forbid(unsafe_code)]

mod cli;
mod cli_config;
mod cli_services;
mod commands;
mod demo;

use clap::Parser;
use estatedesk_core::AppError;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::cli_config::CliConfig;
use crate::cli_services::CliServices;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;
    let services = if cli.demo {
        CliServices::demo(&config).await?
    } else {
        CliServices::connect(&config)?
    };

    info!(
        api_base_url = %config.api_base_url,
        role = %config.role_name,
        demo = cli.demo,
        "estatedesk started"
    );

    commands::run(&services, cli.command).await
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
