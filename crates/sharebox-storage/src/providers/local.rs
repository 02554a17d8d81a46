//! Local filesystem storage backend.
//!
//! One directory per share under the configured root, one file per item, a
//! `.metadata` JSON record per share. In-flight uploads are written next to
//! their destination with a temp suffix and atomically renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use sharebox_core::config::storage::{FileStorageConfig, mb_to_bytes};
use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, ShareStore};
use sharebox_entity::item::{Item, ItemInfo};
use sharebox_entity::share::metadata;
use sharebox_entity::share::name::{is_share_name_safe, item_storage_path};
use sharebox_entity::share::quota::WriteWindow;
use sharebox_entity::share::{Options, Share};

use crate::lock::ShareLocks;
use crate::transfer::copy_bounded;

/// Suffix marking in-flight uploads, renamed away on success and never
/// visible in listings or aggregates.
pub(crate) const UPLOAD_TEMP_SUFFIX: &str = "_huploadtemp";

/// Reserved per-share metadata file name.
pub(crate) const METADATA_FILE: &str = ".metadata";

/// Storage backend keeping shares as directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBackend {
    /// Root directory for all shares.
    root: PathBuf,
    /// Per-item size limit in bytes (0 = unlimited).
    max_item_bytes: u64,
    /// Per-share size limit in bytes (0 = unlimited).
    max_share_bytes: u64,
    /// Per-share mutation locks.
    locks: ShareLocks,
}

impl FileBackend {
    /// Create a backend rooted at the configured path, creating the root
    /// directory if needed.
    pub async fn new(config: &FileStorageConfig) -> AppResult<Self> {
        if config.path.is_empty() {
            return Err(AppError::configuration("File backend requires a storage path"));
        }
        let root = PathBuf::from(&config.path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            max_item_bytes: mb_to_bytes(config.max_file_mb),
            max_share_bytes: mb_to_bytes(config.max_share_mb),
            locks: ShareLocks::new(),
        })
    }

    fn share_dir(&self, share: &str) -> PathBuf {
        self.root.join(share)
    }

    fn metadata_path(&self, share: &str) -> PathBuf {
        self.share_dir(share).join(METADATA_FILE)
    }

    /// Resolve an item name to its path relative to the share directory,
    /// rejecting names that escape the share or shadow reserved files.
    fn item_rel(&self, item: &str) -> AppResult<String> {
        item_storage_path(item)
            .ok_or_else(|| AppError::invalid_item_name(format!("Invalid item name: {item}")))
    }

    async fn read_metadata(&self, share: &str) -> AppResult<Share> {
        let bytes = match fs::read(self.metadata_path(share)).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::share_not_found(format!("Share not found: {share}")));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read share metadata: {share}"),
                    e,
                ));
            }
        };
        Ok(metadata::decode(&bytes)?.share)
    }

    async fn write_metadata(&self, share: &str, record: &Share) -> AppResult<()> {
        let bytes = metadata::encode(record)?;
        fs::write(self.metadata_path(share), bytes).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write share metadata: {share}"),
                e,
            )
        })
    }

    /// Walk the live item set of a share: relative path + stat metadata,
    /// skipping dotfiles and in-flight uploads.
    async fn scan_items(&self, share: &str) -> AppResult<Vec<(String, std::fs::Metadata)>> {
        let mut found = Vec::new();
        let mut pending: Vec<(PathBuf, String)> = vec![(self.share_dir(share), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && prefix.is_empty() => {
                    return Err(AppError::share_not_found(format!("Share not found: {share}")));
                }
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to list share: {share}"),
                        e,
                    ));
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
            })? {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') || name.ends_with(UPLOAD_TEMP_SUFFIX) {
                    continue;
                }
                let rel = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let meta = entry.metadata().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Storage, "Failed to stat entry", e)
                })?;
                if meta.is_dir() {
                    pending.push((entry.path(), rel));
                } else {
                    found.push((rel, meta));
                }
            }
        }

        Ok(found)
    }

    /// Recompute `size`/`count` from the live item set and rewrite the
    /// metadata record. The caller must hold the share's lock.
    async fn update_aggregates(&self, share: &str) -> AppResult<()> {
        let mut record = self.read_metadata(share).await?;
        let items = self.scan_items(share).await?;

        record.size = items.iter().map(|(_, m)| m.len()).sum();
        record.count = items.len() as u64;

        self.write_metadata(share, &record).await
    }

    async fn stat_item(&self, share: &str, item: &str) -> AppResult<Item> {
        let rel = self.item_rel(item)?;
        let path = self.share_dir(share).join(&rel);

        let meta = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                return Err(AppError::item_not_found(format!(
                    "Item not found: {share}/{item}"
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::item_not_found(format!(
                    "Item not found: {share}/{item}"
                )));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat item: {share}/{item}"),
                    e,
                ));
            }
        };

        let date_modified = meta
            .modified()
            .ok()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        Ok(Item {
            path: format!("{share}/{rel}"),
            info: ItemInfo {
                size: meta.len(),
                date_modified,
            },
        })
    }
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_owned();
    os.push(UPLOAD_TEMP_SUFFIX);
    PathBuf::from(os)
}

#[async_trait]
impl ShareStore for FileBackend {
    fn backend_type(&self) -> &str {
        "file"
    }

    async fn migrate(&self) -> AppResult<()> {
        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list storage root", e)
        })?;

        let mut upgraded = 0usize;
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read storage root entry", e)
        })? {
            let is_dir = entry.metadata().await.map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let meta_path = entry.path().join(METADATA_FILE);

            let bytes = match fs::read(&meta_path).await {
                Ok(b) => b,
                Err(_) => continue,
            };
            let decoded = match metadata::decode(&bytes) {
                Ok(d) => d,
                Err(e) => {
                    warn!(share = %name, error = %e, "Skipping unreadable metadata record");
                    continue;
                }
            };
            if !decoded.legacy {
                continue;
            }

            let encoded = metadata::encode(&decoded.share)?;
            fs::write(&meta_path, encoded).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to rewrite metadata: {name}"),
                    e,
                )
            })?;
            upgraded += 1;
        }

        if upgraded > 0 {
            info!(upgraded, "Migrated legacy share metadata");
        }
        Ok(())
    }

    async fn create_share(&self, name: &str, owner: &str, options: Options) -> AppResult<Share> {
        if !is_share_name_safe(name) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {name}"
            )));
        }

        match fs::create_dir(self.share_dir(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::share_already_exists(format!(
                    "Share already exists: {name}"
                )));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create share: {name}"),
                    e,
                ));
            }
        }

        let record = Share::new(name, owner, options);
        self.write_metadata(name, &record).await?;

        debug!(share = name, "Created share");
        Ok(record)
    }

    async fn update_share(&self, name: &str, options: Options) -> AppResult<Options> {
        if !is_share_name_safe(name) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {name}"
            )));
        }

        let lock = self.locks.for_share(name);
        let _guard = lock.lock().await;

        let mut record = self.read_metadata(name).await?;
        record.options = options;
        self.write_metadata(name, &record).await?;

        Ok(record.options)
    }

    async fn create_item(
        &self,
        share: &str,
        item: &str,
        declared_size: u64,
        data: ByteStream,
    ) -> AppResult<Item> {
        if !is_share_name_safe(share) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {share}"
            )));
        }
        let rel = self.item_rel(item)?;

        let lock = self.locks.for_share(share);
        let _guard = lock.lock().await;

        let record = self.read_metadata(share).await?;
        let window = WriteWindow::plan(
            record.size,
            self.max_share_bytes,
            self.max_item_bytes,
            declared_size,
        )?;

        let dest = self.share_dir(share).join(&rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create item directory: {share}/{rel}"),
                    e,
                )
            })?;
        }

        let tmp = temp_path(&dest);
        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create upload file: {share}/{rel}"),
                e,
            )
        })?;

        let written = match copy_bounded(data, &window, &mut file).await {
            Ok(w) => w,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };
        drop(file);

        if window.overflowed(written) {
            let _ = fs::remove_file(&tmp).await;
            return Err(window.overflow_violation().into());
        }
        if written == 0 {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::empty_item(format!(
                "Upload produced no data: {share}/{item}"
            )));
        }

        fs::rename(&tmp, &dest).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to finalize upload: {share}/{rel}"),
                e,
            )
        })?;

        self.update_aggregates(share).await?;

        debug!(share, item, bytes = written, "Stored item");
        self.stat_item(share, item).await
    }

    async fn delete_item(&self, share: &str, item: &str) -> AppResult<()> {
        if !is_share_name_safe(share) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {share}"
            )));
        }
        let rel = self.item_rel(item)?;

        let lock = self.locks.for_share(share);
        let _guard = lock.lock().await;

        let path = self.share_dir(share).join(&rel);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::item_not_found(format!(
                    "Item not found: {share}/{item}"
                )));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete item: {share}/{item}"),
                    e,
                ));
            }
        }

        self.update_aggregates(share).await
    }

    async fn get_share(&self, name: &str) -> AppResult<Share> {
        if !is_share_name_safe(name) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {name}"
            )));
        }
        self.read_metadata(name).await
    }

    async fn list_shares(&self) -> AppResult<Vec<Share>> {
        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list storage root", e)
        })?;

        let mut shares = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read storage root entry", e)
        })? {
            let is_dir = entry.metadata().await.map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_share_name_safe(&name) {
                continue;
            }
            // Directories without a readable record are skipped, not fatal.
            match self.read_metadata(&name).await {
                Ok(share) => shares.push(share),
                Err(_) => continue,
            }
        }

        shares.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(shares)
    }

    async fn list_share(&self, name: &str) -> AppResult<Vec<Item>> {
        if !is_share_name_safe(name) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {name}"
            )));
        }

        let entries = self.scan_items(name).await?;
        let mut items: Vec<Item> = entries
            .into_iter()
            .map(|(rel, meta)| {
                let date_modified = meta
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(Utc::now);
                Item {
                    path: format!("{name}/{rel}"),
                    info: ItemInfo {
                        size: meta.len(),
                        date_modified,
                    },
                }
            })
            .collect();

        items.sort_by(|a, b| b.info.date_modified.cmp(&a.info.date_modified));
        Ok(items)
    }

    async fn delete_share(&self, name: &str) -> AppResult<()> {
        if !is_share_name_safe(name) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {name}"
            )));
        }

        let lock = self.locks.for_share(name);
        let guard = lock.lock().await;

        let dir = self.share_dir(name);
        match fs::metadata(&dir).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::share_not_found(format!("Share not found: {name}")));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat share: {name}"),
                    e,
                ));
            }
        }

        fs::remove_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete share: {name}"),
                e,
            )
        })?;

        drop(guard);
        self.locks.forget(name);

        debug!(share = name, "Deleted share");
        Ok(())
    }

    async fn get_item(&self, share: &str, item: &str) -> AppResult<Item> {
        if !is_share_name_safe(share) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {share}"
            )));
        }
        self.stat_item(share, item).await
    }

    async fn get_item_data(&self, share: &str, item: &str) -> AppResult<ByteStream> {
        if !is_share_name_safe(share) {
            return Err(AppError::invalid_share_name(format!(
                "Invalid share name: {share}"
            )));
        }
        let rel = self.item_rel(item)?;
        let path = self.share_dir(share).join(&rel);

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::item_not_found(format!(
                    "Item not found: {share}/{item}"
                )));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open item: {share}/{item}"),
                    e,
                ));
            }
        };

        Ok(Box::pin(ReaderStream::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use futures::StreamExt;
    use sharebox_core::error::ErrorKind;
    use sharebox_entity::share::Exposure;

    const MIB: u64 = 1024 * 1024;

    async fn backend(dir: &Path, max_file_mb: u64, max_share_mb: u64) -> FileBackend {
        FileBackend::new(&FileStorageConfig {
            path: dir.to_str().unwrap().to_string(),
            max_file_mb,
            max_share_mb,
        })
        .await
        .unwrap()
    }

    fn payload(len: usize) -> ByteStream {
        Box::pin(futures::stream::iter(vec![Ok(Bytes::from(vec![
            b'x';
            len
        ]))]))
    }

    fn empty_payload() -> ByteStream {
        Box::pin(futures::stream::iter(Vec::<Result<Bytes, std::io::Error>>::new()))
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_create_then_get_share_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        let before = Utc::now();
        let mut options = Options::default();
        options.validity = 3;
        options.exposure = Exposure::Both;

        let created = store
            .create_share("demo", "alice", options.clone())
            .await
            .unwrap();
        let fetched = store.get_share("demo").await.unwrap();

        assert_eq!(fetched.name, "demo");
        assert_eq!(fetched.owner, "alice");
        assert_eq!(fetched.options, options);
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.size, 0);
        assert_eq!(fetched.count, 0);
        assert!(fetched.date_created >= before && fetched.date_created <= Utc::now());
        assert_eq!(created.name, fetched.name);
    }

    #[tokio::test]
    async fn test_create_duplicate_share_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        store
            .create_share("dup", "", Options::default())
            .await
            .unwrap();
        let err = store
            .create_share("dup", "", Options::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ShareAlreadyExists);
    }

    #[tokio::test]
    async fn test_unsafe_names_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        let err = store
            .create_share("../escape", "", Options::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidShareName);

        store
            .create_share("safe", "", Options::default())
            .await
            .unwrap();
        let err = store
            .create_item("safe", ".metadata", 0, payload(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemName);

        // Traversal resolving onto the metadata record is rejected too.
        let err = store
            .create_item("safe", "x/../.metadata", 0, payload(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemName);
    }

    #[tokio::test]
    async fn test_item_round_trip_updates_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        store
            .create_share("files", "", Options::default())
            .await
            .unwrap();
        let item = store
            .create_item("files", "hello.txt", 11, payload(11))
            .await
            .unwrap();
        assert_eq!(item.path, "files/hello.txt");
        assert_eq!(item.info.size, 11);

        let share = store.get_share("files").await.unwrap();
        assert_eq!(share.size, 11);
        assert_eq!(share.count, 1);

        let data = collect(store.get_item_data("files", "hello.txt").await.unwrap()).await;
        assert_eq!(data, vec![b'x'; 11]);
    }

    #[tokio::test]
    async fn test_quota_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 4, 5).await;
        store
            .create_share("quota", "", Options::default())
            .await
            .unwrap();

        // 5 MiB item against a 4 MiB item limit: rejected before any I/O.
        let err = store
            .create_item("quota", "big", 5 * MIB, empty_payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MaxFileSizeReached);

        // 3 MiB fits; aggregate reflects it.
        store
            .create_item("quota", "first", 3 * MIB, payload(3 * MIB as usize))
            .await
            .unwrap();
        assert_eq!(store.get_share("quota").await.unwrap().size, 3 * MIB);

        // A second 3 MiB no longer fits: only 2 MiB remain.
        let err = store
            .create_item("quota", "second", 3 * MIB, payload(3 * MIB as usize))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MaxShareSizeReached);
    }

    #[tokio::test]
    async fn test_exactly_filling_remaining_capacity_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 4, 5).await;
        store
            .create_share("brim", "", Options::default())
            .await
            .unwrap();

        store
            .create_item("brim", "first", 3 * MIB, payload(3 * MIB as usize))
            .await
            .unwrap();
        // Exactly the remaining 2 MiB: accepted.
        store
            .create_item("brim", "second", 2 * MIB, payload(2 * MIB as usize))
            .await
            .unwrap();

        let share = store.get_share("brim").await.unwrap();
        assert_eq!(share.size, 5 * MIB);
        assert_eq!(share.count, 2);

        // The share is now full; nothing else fits.
        let err = store
            .create_item("brim", "third", 1, payload(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MaxShareSizeReached);
    }

    #[tokio::test]
    async fn test_undeclared_oversized_stream_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 1, 0).await;
        store
            .create_share("trunc", "", Options::default())
            .await
            .unwrap();

        // Declared size unknown, stream larger than the 1 MiB item limit.
        let err = store
            .create_item("trunc", "oversized", 0, payload((MIB + 17) as usize))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MaxFileSizeReached);

        let err = store.get_item("trunc", "oversized").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ItemNotFound);

        // No temp residue either.
        let items = store.list_share("trunc").await.unwrap();
        assert!(items.is_empty());
        let share = store.get_share("trunc").await.unwrap();
        assert_eq!(share.size, 0);
    }

    #[tokio::test]
    async fn test_zero_byte_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("zero", "", Options::default())
            .await
            .unwrap();

        let err = store
            .create_item("zero", "nothing", 0, empty_payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyItem);
        assert!(store.list_share("zero").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_overwrite_replaces_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("upsert", "", Options::default())
            .await
            .unwrap();

        store
            .create_item("upsert", "doc", 100, payload(100))
            .await
            .unwrap();
        store
            .create_item("upsert", "doc", 40, payload(40))
            .await
            .unwrap();

        let share = store.get_share("upsert").await.unwrap();
        assert_eq!(share.count, 1);
        assert_eq!(share.size, 40);
    }

    #[tokio::test]
    async fn test_delete_item_and_missing_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("del", "", Options::default())
            .await
            .unwrap();
        store
            .create_item("del", "gone.txt", 5, payload(5))
            .await
            .unwrap();

        store.delete_item("del", "gone.txt").await.unwrap();
        let share = store.get_share("del").await.unwrap();
        assert_eq!(share.size, 0);
        assert_eq!(share.count, 0);

        let err = store.delete_item("del", "gone.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ItemNotFound);
    }

    #[tokio::test]
    async fn test_list_share_sorted_newest_first_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("sorted", "", Options::default())
            .await
            .unwrap();

        store
            .create_item("sorted", "older", 3, payload(3))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store
            .create_item("sorted", "newer", 3, payload(3))
            .await
            .unwrap();

        // Dotfiles and in-flight temp files never show up.
        fs::write(dir.path().join("sorted/.hidden"), b"x").await.unwrap();
        fs::write(
            dir.path().join(format!("sorted/partial{UPLOAD_TEMP_SUFFIX}")),
            b"x",
        )
        .await
        .unwrap();

        let items = store.list_share("sorted").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, "sorted/newer");
        assert_eq!(items[1].path, "sorted/older");
    }

    #[tokio::test]
    async fn test_list_shares_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        store
            .create_share("earlier", "", Options::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store
            .create_share("later", "", Options::default())
            .await
            .unwrap();

        let shares = store.list_shares().await.unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].name, "later");
        assert_eq!(shares[1].name, "earlier");
    }

    #[tokio::test]
    async fn test_delete_share_cascades() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("doomed", "", Options::default())
            .await
            .unwrap();
        store
            .create_item("doomed", "a", 4, payload(4))
            .await
            .unwrap();
        store
            .create_item("doomed", "b", 4, payload(4))
            .await
            .unwrap();

        store.delete_share("doomed").await.unwrap();

        let err = store.get_share("doomed").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ShareNotFound);
        assert!(!dir.path().join("doomed").exists());

        let err = store.delete_share("doomed").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ShareNotFound);
    }

    #[tokio::test]
    async fn test_update_share_replaces_options_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        let created = store
            .create_share("opts", "alice", Options::default())
            .await
            .unwrap();

        let mut next = Options::default();
        next.validity = 30;
        next.exposure = Exposure::Download;
        next.message = "grab it".into();

        let returned = store.update_share("opts", next.clone()).await.unwrap();
        assert_eq!(returned, next);

        let after = store.get_share("opts").await.unwrap();
        assert_eq!(after.options, next);
        assert_eq!(after.name, created.name);
        assert_eq!(after.owner, created.owner);
        assert_eq!(after.date_created, created.date_created);
    }

    #[tokio::test]
    async fn test_traversal_confined_to_share() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("jail", "", Options::default())
            .await
            .unwrap();

        // `..` segments resolve against the share root, not the filesystem.
        let item = store
            .create_item("jail", "a/../../break.txt", 4, payload(4))
            .await
            .unwrap();
        assert_eq!(item.path, "jail/break.txt");
        assert!(dir.path().join("jail/break.txt").exists());
        assert!(!dir.path().join("break.txt").exists());
    }

    #[tokio::test]
    async fn test_nested_item_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;
        store
            .create_share("tree", "", Options::default())
            .await
            .unwrap();

        store
            .create_item("tree", "sub/dir/file.bin", 8, payload(8))
            .await
            .unwrap();

        let share = store.get_share("tree").await.unwrap();
        assert_eq!(share.size, 8);
        assert_eq!(share.count, 1);

        let items = store.list_share("tree").await.unwrap();
        assert_eq!(items[0].path, "tree/sub/dir/file.bin");

        store.delete_item("tree", "sub/dir/file.bin").await.unwrap();
        assert_eq!(store.get_share("tree").await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_migrate_upgrades_legacy_records_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let store = backend(dir.path(), 0, 0).await;

        // A pre-versioning record written by an older deployment.
        fs::create_dir(dir.path().join("vintage")).await.unwrap();
        fs::write(
            dir.path().join("vintage/.metadata"),
            br#"{"name":"vintage","owner":"carol","created":"2023-06-01T12:00:00Z","validity":15,"exposure":"download"}"#,
        )
        .await
        .unwrap();

        // A current record that must be left untouched.
        store
            .create_share("modern", "dave", Options::default())
            .await
            .unwrap();
        let modern_before = fs::read(dir.path().join("modern/.metadata")).await.unwrap();

        store.migrate().await.unwrap();

        let vintage = store.get_share("vintage").await.unwrap();
        assert_eq!(vintage.version, 1);
        assert_eq!(vintage.owner, "carol");
        assert_eq!(vintage.options.validity, 15);
        assert_eq!(vintage.options.exposure, Exposure::Download);

        let first_pass = fs::read(dir.path().join("vintage/.metadata")).await.unwrap();
        store.migrate().await.unwrap();
        let second_pass = fs::read(dir.path().join("vintage/.metadata")).await.unwrap();
        assert_eq!(first_pass, second_pass);

        let modern_after = fs::read(dir.path().join("modern/.metadata")).await.unwrap();
        assert_eq!(modern_before, modern_after);
    }
}
