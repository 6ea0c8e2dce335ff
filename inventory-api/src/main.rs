use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use inventory_api::config::AppConfig;
use inventory_api::logging::init_logging;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "inventory-api")]
#[command(about = "IT asset inventory API server")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,
}

#[rocket::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version_info {
        println!("inventory-api {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Dropping the guards flushes the file writers.
    let _guards = match init_logging(&config.log_dir) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("failed to initialise logging in {}: {}", config.log_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match env::current_dir() {
        Ok(path) => info!("Current directory: {}", path.display()),
        Err(e) => error!("Error getting current directory: {}", e),
    };

    info!("Inventory API v{} starting", built_info::PKG_VERSION);
    info!("Built: {}", built_info::BUILT_TIME_UTC);
    if let Some(commit) = built_info::GIT_COMMIT_HASH {
        info!("Git commit: {}", commit);
    }

    let rocket = match inventory_api::rocket(&config) {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rocket.launch().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Rocket server failed to launch: {}", e);
            ExitCode::FAILURE
        }
    }
}
