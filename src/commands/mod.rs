//! CLI command definitions and dispatch.

pub mod item;
pub mod migrate;
pub mod share;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use sharebox_core::config::AppConfig;
use sharebox_core::error::AppError;
use sharebox_core::traits::storage::ShareStore;

use crate::output::OutputFormat;

/// Sharebox: temporary file shares over pluggable storage backends
#[derive(Debug, Parser)]
#[command(name = "sharebox", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (config/<env>.toml)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upgrade stored share metadata to the current schema
    Migrate(migrate::MigrateArgs),
    /// Share management
    Share(share::ShareArgs),
    /// Item upload, download, and management
    Item(item::ItemArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Share(args) => share::execute(args, config, self.format).await,
            Commands::Item(args) => item::execute(args, config, self.format).await,
        }
    }
}

/// Helper: build the storage backend selected by configuration
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn ShareStore>, AppError> {
    sharebox_storage::backend_from_config(&config.storage).await
}
