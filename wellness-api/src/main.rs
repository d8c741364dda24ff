// wellness-api/src/main.rs

use clap::{Parser, Subcommand};
use rocket::{error, info};
use std::env;
use std::process::ExitCode;

use wellness_api::built_info;

#[derive(Parser)]
#[command(name = "wellness-api")]
#[command(about = "REST API for publishing wellness sessions")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Wipe the database and load the demo users and sessions
    Seed {
        /// Confirm wiping a production database
        #[arg(long)]
        yes: bool,
    },
}

#[rocket::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version_info {
        println!("wellness-api {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return ExitCode::SUCCESS;
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    if let Some(Command::Seed { yes }) = cli.command {
        return match wellness_api::seed::run_seed(&wellness_api::config::figment(), yes) {
            Ok(summary) => {
                println!(
                    "Seeded {} users, {} published and {} draft sessions",
                    summary.users, summary.published, summary.drafts
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Seeding failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match env::current_dir() {
        Ok(path) => info!("Current directory: {}", path.display()),
        Err(e) => error!("Error getting current directory: {}", e),
    };

    info!("Wellness API v{} starting", built_info::PKG_VERSION);
    info!("Built: {}", built_info::BUILT_TIME_UTC);
    if let Some(commit) = built_info::GIT_COMMIT_HASH {
        info!("Git commit: {}", commit);
    }

    let rocket = match wellness_api::rocket() {
        Ok(rocket) => rocket,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = rocket.launch().await {
        eprintln!("Rocket server failed to launch: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
