//! Quota-bounded streaming transfer shared by both backends.

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::ByteStream;
use sharebox_entity::share::quota::WriteWindow;

/// Copy `data` into `file`, reading at most one byte past the write window.
///
/// The stream is pulled chunk by chunk, so the payload is never buffered in
/// memory; bytes beyond the bound are simply not read from the source.
/// Returns the number of bytes written. The caller decides what an
/// overflowing or empty transfer means and owns cleanup of the file.
pub(crate) async fn copy_bounded(
    mut data: ByteStream,
    window: &WriteWindow,
    file: &mut File,
) -> AppResult<u64> {
    let mut budget = window.read_limit();
    let mut written = 0u64;

    while let Some(chunk) = data.next().await {
        let mut chunk =
            chunk.map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;

        if let Some(remaining) = budget {
            if remaining == 0 {
                break;
            }
            if chunk.len() as u64 > remaining {
                chunk.truncate(remaining as usize);
            }
            budget = Some(remaining - chunk.len() as u64);
        }

        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush upload", e))?;

    Ok(written)
}
