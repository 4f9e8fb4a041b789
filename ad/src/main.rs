//! Ando - trip itinerary generation
//!
//! CLI entry point for the API server and operator commands.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use ando::cli::{Cli, Command};
use ando::config::Config;
use ando::domain::Identity;
use ando::generation::ItineraryGenerator;
use ando::llm::create_client;
use ando::prompts::PromptBuilder;
use ando::share::{ShareError, resolve_shared_trip};
use ando::state::StateManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ando")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("ando.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, db_dir = %config.storage.db_dir.display(), "Ando loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { bind } => {
            debug!(?bind, "main: matched Serve command");
            cmd_serve(&config, bind.as_deref()).await
        }
        Command::Generate { trip_id, user } => {
            debug!(%trip_id, %user, "main: matched Generate command");
            cmd_generate(&config, &trip_id, &user).await
        }
        Command::Trips { user, all } => {
            debug!(%user, all, "main: matched Trips command");
            cmd_trips(&config, &user, all).await
        }
        Command::Shared { token } => {
            debug!("main: matched Shared command");
            cmd_shared(&config, &token).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Run the API server in the foreground
async fn cmd_serve(config: &Config, bind: Option<&str>) -> Result<()> {
    debug!(?bind, "cmd_serve: called");
    config.validate()?;
    println!(
        "Ando API listening on {} (logs in {})",
        bind.unwrap_or(&config.server.bind),
        log_path().display()
    );
    ando::serve(config, bind).await
}

/// Generate an itinerary for one trip and print it as JSON
async fn cmd_generate(config: &Config, trip_id: &str, user: &str) -> Result<()> {
    debug!(%trip_id, %user, "cmd_generate: called");
    config.validate()?;
    let identity = Identity::new(user).ok_or_else(|| eyre::eyre!("User id must not be blank"))?;

    let state = StateManager::spawn(&config.storage.db_dir)?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(PromptBuilder::new()?);
    let generator = ItineraryGenerator::new(state.clone(), llm, prompts).with_max_tokens(config.llm.max_tokens);

    let result = generator.generate(Some(&identity), trip_id).await;
    state.shutdown().await?;
    let itinerary = result.context("Itinerary generation failed")?;

    info!(
        trip_id = %itinerary.trip_id,
        version = itinerary.version,
        days = itinerary.days.len(),
        "Itinerary is now active"
    );
    println!("{}", serde_json::to_string_pretty(&itinerary)?);
    Ok(())
}

/// List a user's trips with their generation state
async fn cmd_trips(config: &Config, user: &str, include_archived: bool) -> Result<()> {
    debug!(%user, include_archived, "cmd_trips: called");
    let state = StateManager::spawn(&config.storage.db_dir)?;
    let trips = state.list_trips(user, include_archived).await;
    state.shutdown().await?;
    let trips = trips?;

    if trips.is_empty() {
        println!("No trips for {}", user);
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<23} {:<10} {:<10} ITINERARY",
        "ID", "DESTINATION", "DATES", "STATUS", "GENERATION"
    );
    for listing in &trips {
        let trip = &listing.trip;
        println!(
            "{:<38} {:<20} {} - {} {:<10} {:<10} {}",
            trip.id,
            trip.destination,
            trip.start_date,
            trip.end_date,
            trip.status.as_str(),
            trip.generation.status.as_str(),
            if listing.has_active_itinerary { "yes" } else { "no" }
        );
    }
    Ok(())
}

/// Print the public view of a shared trip as JSON
async fn cmd_shared(config: &Config, token: &str) -> Result<()> {
    debug!("cmd_shared: called");
    let state = StateManager::spawn(&config.storage.db_dir)?;
    let result = resolve_shared_trip(&state, token).await;
    state.shutdown().await?;

    match result {
        Ok(shared) => {
            println!("{}", serde_json::to_string_pretty(&shared)?);
            Ok(())
        }
        Err(ShareError::NotFound) => {
            println!("No shared trip for that link");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Print the effective configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ando")
        .join("logs")
        .join("ando.log")
}
