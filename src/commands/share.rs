//! Share management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use sharebox_core::config::AppConfig;
use sharebox_core::error::AppError;
use sharebox_entity::share::{Exposure, Options, PublicShare, Share};

use crate::output::{self, OutputFormat};

/// Arguments for share commands
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Share subcommand
    #[command(subcommand)]
    pub command: ShareCommand,
}

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Create a new share
    Create {
        /// Share name
        name: String,
        /// Owner recorded in the metadata
        #[arg(short, long, default_value = "")]
        owner: String,
        /// Validity in days (0 = never expires; default from configuration)
        #[arg(short, long)]
        validity: Option<i64>,
        /// Exposure policy: upload, download, or both
        #[arg(short = 'x', long, default_value = "upload")]
        exposure: String,
        /// Description shown to the owner
        #[arg(short, long)]
        description: Option<String>,
        /// Message shown to visitors
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List all shares, newest first
    List,
    /// Show a single share
    Show {
        /// Share name
        name: String,
        /// Show only the fields exposed to unauthenticated visitors
        #[arg(long)]
        public: bool,
    },
    /// Replace the options of a share
    Update {
        /// Share name
        name: String,
        /// Validity in days (0 = never expires)
        #[arg(short, long)]
        validity: Option<i64>,
        /// Exposure policy: upload, download, or both
        #[arg(short = 'x', long)]
        exposure: Option<String>,
        /// Description shown to the owner
        #[arg(short, long)]
        description: Option<String>,
        /// Message shown to visitors
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Delete a share and all of its items
    Delete {
        /// Share name
        name: String,
    },
}

/// Share display row
#[derive(Debug, Serialize, Tabled)]
struct ShareRow {
    /// Name
    name: String,
    /// Owner
    owner: String,
    /// Created at
    created: String,
    /// Validity in days
    validity: i64,
    /// Exposure
    exposure: String,
    /// Aggregate bytes
    size: u64,
    /// Item count
    count: u64,
    /// Still valid
    valid: bool,
}

impl ShareRow {
    fn from_share(share: &Share) -> Self {
        Self {
            name: share.name.clone(),
            owner: share.owner.clone(),
            created: share.date_created.format("%Y-%m-%d %H:%M").to_string(),
            validity: share.options.validity,
            exposure: exposure_str(share.options.exposure).to_string(),
            size: share.size,
            count: share.count,
            valid: share.is_valid(),
        }
    }
}

/// Execute share commands
pub async fn execute(
    args: &ShareArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::build_store(config).await?;

    match &args.command {
        ShareCommand::Create {
            name,
            owner,
            validity,
            exposure,
            description,
            message,
        } => {
            let options = Options {
                validity: validity.unwrap_or(config.storage.default_validity_days),
                exposure: parse_exposure(exposure)?,
                description: description.clone().unwrap_or_default(),
                message: message.clone().unwrap_or_default(),
            };
            let share = store.create_share(name, owner, options).await?;
            output::print_success(&format!("Created share '{}'", share.name));
        }
        ShareCommand::List => {
            let shares = store.list_shares().await?;
            let rows: Vec<ShareRow> = shares.iter().map(ShareRow::from_share).collect();
            output::print_list(&rows, format);
        }
        ShareCommand::Show { name, public } => {
            let share = store.get_share(name).await?;
            if *public {
                let projection = PublicShare::for_share(&share);
                match format {
                    OutputFormat::Json => output::print_json(&projection),
                    OutputFormat::Table => {
                        output::print_kv("name", &projection.name);
                        output::print_kv("exposure", exposure_str(projection.exposure));
                        output::print_kv("message", &projection.message);
                    }
                }
            } else {
                match format {
                    OutputFormat::Json => output::print_json(&share),
                    OutputFormat::Table => {
                        output::print_kv("name", &share.name);
                        output::print_kv("owner", &share.owner);
                        output::print_kv("created", &share.date_created.to_rfc3339());
                        output::print_kv("validity", &share.options.validity.to_string());
                        output::print_kv("exposure", exposure_str(share.options.exposure));
                        output::print_kv("description", &share.options.description);
                        output::print_kv("message", &share.options.message);
                        output::print_kv("size", &share.size.to_string());
                        output::print_kv("count", &share.count.to_string());
                        output::print_kv("valid", &share.is_valid().to_string());
                    }
                }
            }
        }
        ShareCommand::Update {
            name,
            validity,
            exposure,
            description,
            message,
        } => {
            // Options are replaced wholesale by the backend; start from the
            // current record so omitted flags keep their value.
            let current = store.get_share(name).await?.options;
            let options = Options {
                validity: validity.unwrap_or(current.validity),
                exposure: match exposure {
                    Some(e) => parse_exposure(e)?,
                    None => current.exposure,
                },
                description: description.clone().unwrap_or(current.description),
                message: message.clone().unwrap_or(current.message),
            };
            store.update_share(name, options).await?;
            output::print_success(&format!("Updated share '{name}'"));
        }
        ShareCommand::Delete { name } => {
            store.delete_share(name).await?;
            output::print_success(&format!("Deleted share '{name}'"));
        }
    }

    Ok(())
}

fn parse_exposure(value: &str) -> Result<Exposure, AppError> {
    match value {
        "upload" => Ok(Exposure::Upload),
        "download" => Ok(Exposure::Download),
        "both" => Ok(Exposure::Both),
        other => Err(AppError::validation(format!(
            "Unknown exposure '{other}' (expected upload, download, or both)"
        ))),
    }
}

fn exposure_str(exposure: Exposure) -> &'static str {
    match exposure {
        Exposure::Upload => "upload",
        Exposure::Download => "download",
        Exposure::Both => "both",
    }
}
