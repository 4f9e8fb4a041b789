//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ando - trip itinerary generation
#[derive(Parser)]
#[command(
    name = "ando",
    about = "Generate, version and share trip itineraries",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate (or regenerate) the itinerary for a trip
    Generate {
        /// Trip id
        trip_id: String,

        /// User the request runs as
        #[arg(short, long)]
        user: String,
    },

    /// List a user's trips
    Trips {
        /// Owner of the trips
        #[arg(short, long)]
        user: String,

        /// Include archived trips
        #[arg(short, long)]
        all: bool,
    },

    /// Show the public view behind a share token
    Shared {
        /// Share token from the trip's link
        token: String,
    },

    /// Print the effective configuration
    Config,
}
