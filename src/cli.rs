//! Command line interface.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mureader")]
#[command(about = "A small personal feed reader")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", env = "MUREADER_CONFIG")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the web server
    Serve,

    /// Create the database and apply migrations
    CreateDb,

    /// Drop every table of the database
    DropDb {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Fetch every subscribed feed once
    Refresh,
}
