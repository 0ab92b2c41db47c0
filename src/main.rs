mod backend;
mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod session;
mod tasks;
mod voting;

use clap::Parser;
use commands::Cli;
use config::Settings;
use db::Database;
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Using {} with {} bracket ordering",
        settings.database_url, settings.session.ordering
    );

    let database = match Database::new(&settings.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            eprintln!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = commands::handle_command(database, &settings, cli.command).await {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
