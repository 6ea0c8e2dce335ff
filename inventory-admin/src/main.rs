use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod admin_cli;

use admin_cli::device_commands::{DeviceAction, handle_device_command_with_conn};
use admin_cli::export_commands::{ExportAction, handle_export_command_with_conn};
use admin_cli::log_commands::{CleanupArgs, ViewArgs, handle_cleanup_logs, handle_view_logs};
use admin_cli::maintenance_commands::{MaintenanceAction, handle_maintenance_command_with_conn};
use admin_cli::reference_commands::{
    CategoryAction, LocationAction, VendorAction, handle_category_command_with_conn,
    handle_location_command_with_conn, handle_vendor_command_with_conn,
};
use admin_cli::software_commands::{SoftwareAction, handle_software_command_with_conn};
use admin_cli::user_commands::{UserAction, handle_user_command_with_conn};
use admin_cli::utils::{establish_connection, now};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "inventory-admin")]
#[command(about = "Administrative tasks for the IT asset inventory")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Delete old log files, rotate large ones and compress backups")]
    CleanupLogs(CleanupArgs),
    #[command(about = "View and summarize application logs")]
    ViewLogs(ViewArgs),
    #[command(about = "Device listings")]
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    #[command(about = "Software license listings")]
    Software {
        #[command(subcommand)]
        action: SoftwareAction,
    },
    #[command(about = "Maintenance record listings")]
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceAction,
    },
    #[command(about = "Category management")]
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    #[command(about = "Location management")]
    Location {
        #[command(subcommand)]
        action: LocationAction,
    },
    #[command(about = "Vendor management")]
    Vendor {
        #[command(subcommand)]
        action: VendorAction,
    },
    #[command(about = "Bulk exports")]
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
    #[command(about = "Login user management")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::CleanupLogs(args) => handle_cleanup_logs(args),
        Commands::ViewLogs(args) => handle_view_logs(args),
        Commands::Device { action } => {
            handle_device_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Software { action } => {
            handle_software_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Maintenance { action } => {
            handle_maintenance_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Category { action } => {
            handle_category_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Location { action } => {
            handle_location_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Vendor { action } => {
            handle_vendor_command_with_conn(&mut establish_connection()?, action, now())
        }
        Commands::Export { action } => {
            handle_export_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::User { action } => {
            handle_user_command_with_conn(&mut establish_connection()?, action, now())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version_info {
        println!("inventory-admin {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        eprintln!("No command given. Run with --help for usage.");
        return ExitCode::FAILURE;
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
