//! Item upload, download, and management CLI commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tabled::Tabled;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use sharebox_core::config::AppConfig;
use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::traits::storage::ByteStream;
use sharebox_entity::item::Item;

use crate::output::{self, OutputFormat};

/// Arguments for item commands
#[derive(Debug, Args)]
pub struct ItemArgs {
    /// Item subcommand
    #[command(subcommand)]
    pub command: ItemCommand,
}

/// Item subcommands
#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// List the items of a share, most recently modified first
    List {
        /// Share name
        share: String,
    },
    /// Upload a file into a share
    Upload {
        /// Share name
        share: String,
        /// Path of the file to upload
        file: PathBuf,
        /// Item name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Download an item
    Download {
        /// Share name
        share: String,
        /// Item name
        item: String,
        /// Destination file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an item
    Delete {
        /// Share name
        share: String,
        /// Item name
        item: String,
    },
}

/// Item display row
#[derive(Debug, Serialize, Tabled)]
struct ItemRow {
    /// Path
    path: String,
    /// Size in bytes
    size: u64,
    /// Last modified
    modified: String,
}

impl ItemRow {
    fn from_item(item: &Item) -> Self {
        Self {
            path: item.path.clone(),
            size: item.info.size,
            modified: item.info.date_modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute item commands
pub async fn execute(
    args: &ItemArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::build_store(config).await?;

    match &args.command {
        ItemCommand::List { share } => {
            let items = store.list_share(share).await?;
            let rows: Vec<ItemRow> = items.iter().map(ItemRow::from_item).collect();
            output::print_list(&rows, format);
        }
        ItemCommand::Upload { share, file, name } => {
            let item_name = match name {
                Some(n) => n.clone(),
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| {
                        AppError::validation(format!(
                            "Cannot derive an item name from {}",
                            file.display()
                        ))
                    })?,
            };

            let meta = tokio::fs::metadata(file).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Cannot read {}", file.display()),
                    e,
                )
            })?;
            let source = tokio::fs::File::open(file).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Cannot open {}", file.display()),
                    e,
                )
            })?;
            let data: ByteStream = Box::pin(ReaderStream::new(source));

            let item = store.create_item(share, &item_name, meta.len(), data).await?;
            output::print_success(&format!("Uploaded {} ({} bytes)", item.path, item.info.size));
        }
        ItemCommand::Download { share, item, output: dest } => {
            let mut stream = store.get_item_data(share, item).await?;

            match dest {
                Some(path) => {
                    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Storage,
                            format!("Cannot create {}", path.display()),
                            e,
                        )
                    })?;
                    let written = pump(&mut stream, &mut file).await?;
                    output::print_success(&format!(
                        "Downloaded {share}/{item} to {} ({written} bytes)",
                        path.display()
                    ));
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    pump(&mut stream, &mut stdout).await?;
                }
            }
        }
        ItemCommand::Delete { share, item } => {
            store.delete_item(share, item).await?;
            output::print_success(&format!("Deleted {share}/{item}"));
        }
    }

    Ok(())
}

async fn pump<W: tokio::io::AsyncWrite + Unpin>(
    stream: &mut ByteStream,
    writer: &mut W,
) -> Result<u64, AppError> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Download stream error", e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to write output", e))?;
        written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush output", e))?;
    Ok(written)
}
