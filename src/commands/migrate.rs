//! Metadata migration CLI command.

use clap::Args;

use sharebox_core::config::AppConfig;
use sharebox_core::error::AppError;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {}

/// Execute the migrate command
pub async fn execute(_args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = super::build_store(config).await?;
    store.migrate().await?;
    output::print_success(&format!(
        "Migration complete ({} backend)",
        store.backend_type()
    ));
    Ok(())
}
