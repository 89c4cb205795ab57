use std::io::{self, Write};

use clap::Parser;
use tracing::{error, info};

use mureader::cli::{Cli, Commands};
use mureader::{Config, Database, FeedFetcher, FeedService, Result, WebServer};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config);
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = mureader::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mureader::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(cli.command, config).await {
        error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Serve => cmd_serve(config).await,
        Commands::CreateDb => cmd_create_db(&config).await,
        Commands::DropDb { yes } => cmd_drop_db(&config, yes).await,
        Commands::Refresh => cmd_refresh(&config).await,
    }
}

async fn cmd_serve(config: Config) -> Result<()> {
    config.validate()?;

    info!("mureader {}", env!("CARGO_PKG_VERSION"));
    let db = Database::open(&config.database.path).await?;
    WebServer::new(&config.web, &config.feeds, db)?.run().await
}

async fn cmd_create_db(config: &Config) -> Result<()> {
    let db = Database::open(&config.database.path).await?;
    println!(
        "Database ready at {} (schema version {})",
        config.database.path,
        db.schema_version().await?
    );
    db.close().await;
    Ok(())
}

async fn cmd_drop_db(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        print!("Drop all tables in {}? [y/N] ", config.database.path);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let db = Database::open(&config.database.path).await?;
    db.drop_all().await?;
    db.close().await;
    println!("All tables dropped.");
    Ok(())
}

async fn cmd_refresh(config: &Config) -> Result<()> {
    let db = Database::open(&config.database.path).await?;
    let fetcher = FeedFetcher::new(&config.feeds)?;

    let summary = FeedService::new(&db, &fetcher).refresh_all().await?;
    println!(
        "Refreshed {} feeds: {} new entries, {} updated, {} failed",
        summary.feeds, summary.new_entries, summary.updated_entries, summary.failed
    );

    db.close().await;
    Ok(())
}
