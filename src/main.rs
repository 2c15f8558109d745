use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use log::{info, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

mod models;
mod repositories;
pub mod services;
pub mod settings;

use repositories::snapshot::SnapshotRepository;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs).expect("Failed to initialize logging.");
    let settings = settings::Settings::load(&args.config).expect("Could not load config file.");

    // Pull the latest remote snapshot before any connection opens, so a
    // half-restored file is never visible to the pool.
    if settings.snapshot.enabled {
        let snapshots = SnapshotRepository::new(
            settings.snapshot.url.clone(),
            settings.snapshot.auth_token.clone(),
            settings.sqlite.path.clone(),
        );

        match snapshots.restore().await {
            Ok(true) => info!("Restored database snapshot from remote."),
            Ok(false) => info!("No remote snapshot yet, starting from the local database."),
            Err(e) => warn!("Could not restore snapshot: {}", e),
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&settings.sqlite.path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    let conn = SqlitePoolOptions::new()
        .max_connections(settings.sqlite.max_connections)
        .connect_with(options)
        .await
        .expect("Could not connect to database.");

    repositories::leads::init_schema(&conn)
        .await
        .expect("Could not initialize database schema.");

    println!("[*] Starting services.");
    services::start_services(conn, settings, args.listen)
        .await
        .expect("Could not start services.");
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
