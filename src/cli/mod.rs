//! CLI Module
//!
//! Command-line interface for Agora using Clap v4.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

/// Agora - Multi-party debate engine for simulated historical figures
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,

    /// Database operations
    Db {
        #[command(subcommand)]
        operation: DbCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create the database and schema without starting the server
    Migrate,
    /// Insert a sample debate for local exploration
    Seed,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.debug {
        config.logging.level = "debug".to_string();
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Init { force } => init_config(config_path, force),
        Commands::Config => show_config(&config),
        Commands::Db { operation } => db_command(config, operation).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    crate::logging::init(&config.logging);
    config.validate()?;

    let provider = crate::provider::create_provider(&config)?;
    let pool = crate::db::init_database(&config.database.path).await?;
    let engine = crate::engine::TurnEngine::new(pool, provider, &config);

    crate::server::start_server(&config.server, engine).await
}

fn init_config(path: PathBuf, force: bool) -> Result<()> {
    Config::write_default(&path, force)?;
    println!("Wrote configuration to {}", path.display());
    Ok(())
}

async fn db_command(config: Config, operation: DbCommands) -> Result<()> {
    crate::logging::init(&config.logging);
    let pool = crate::db::init_database(&config.database.path).await?;

    match operation {
        DbCommands::Migrate => {
            println!("Database ready at {}", config.database.path.display());
        }
        DbCommands::Seed => {
            let debates = crate::db::DebateRepository::new(pool.clone());
            let memories = crate::db::MemoryRepository::new(pool);
            let topic = "Is virtue teachable?";
            let participants = vec!["socrates".to_string(), "nietzsche".to_string()];
            let debate = debates
                .create(
                    "Socrates vs. Friedrich Nietzsche: Is virtue teachable?",
                    topic,
                    crate::debate::DebateFormat::Oxford,
                    &participants,
                    false,
                )
                .await?;
            for character_id in &participants {
                let memory =
                    crate::memory::WorkingMemory::init(character_id, &debate.id, topic);
                memories
                    .save_working_memory(&debate.id, character_id, &memory)
                    .await?;
            }
            println!("Seeded debate {} ({topic})", debate.id);
        }
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("<redacted>".to_string());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
