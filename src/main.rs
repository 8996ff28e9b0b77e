use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

use civic_polls::commands::{handle_poll_command, Cli};
use civic_polls::config::AppConfig;
use civic_polls::db::Database;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let database = match Database::connect(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to connect to database {}: {}", config.database_url, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Database connected: {}", config.database_url);

    match handle_poll_command(database, config.view, cli.command).await {
        Ok(output) => {
            println!("{}", output.trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
