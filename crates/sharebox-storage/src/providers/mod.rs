//! Storage backend implementations.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;

use sharebox_core::config::storage::StorageConfig;
use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::ShareStore;

pub use local::FileBackend;
#[cfg(feature = "s3")]
pub use s3::S3Backend;

/// Build the backend selected by configuration.
///
/// The returned trait object is constructed once at startup and injected
/// into every consumer; no global instance exists.
pub async fn backend_from_config(config: &StorageConfig) -> AppResult<Arc<dyn ShareStore>> {
    match config.backend.as_str() {
        "file" => Ok(Arc::new(FileBackend::new(&config.file).await?)),
        #[cfg(feature = "s3")]
        "s3" => Ok(Arc::new(S3Backend::new(&config.s3).await?)),
        other => Err(AppError::configuration(format!(
            "Unknown storage backend: {other}"
        ))),
    }
}
