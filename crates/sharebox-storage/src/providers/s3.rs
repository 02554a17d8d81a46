//! S3-compatible object storage backend.
//!
//! Same contract as the file backend over an object store: the share record
//! lives at `shares/<share>/.metadata`, items at `<share>/<item>`, and
//! prefix listing stands in for directory reads. Uploads spool through a
//! bounded local temp file so quota enforcement matches the file backend
//! byte for byte, then land with a single `PutObject`. The store's put
//! semantics give all-or-nothing visibility, so no temp-object protocol is
//! needed.

use std::path::PathBuf;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::primitives::DateTime as S3Timestamp;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sharebox_core::config::storage::{S3StorageConfig, mb_to_bytes};
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

/// Prefix under which share metadata objects live, separate from item keys.
const METADATA_ROOT: &str = "shares";

/// Reserved metadata object name.
const METADATA_OBJECT: &str = ".metadata";

/// Storage backend keeping shares in an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
    /// Per-item size limit in bytes (0 = unlimited).
    max_item_bytes: u64,
    /// Per-share size limit in bytes (0 = unlimited).
    max_share_bytes: u64,
    /// Per-share mutation locks (in-process only; concurrent instances still
    /// race on the metadata object).
    locks: ShareLocks,
}

fn metadata_key(share: &str) -> String {
    format!("{METADATA_ROOT}/{share}/{METADATA_OBJECT}")
}

fn item_prefix(share: &str) -> String {
    format!("{share}/")
}

fn item_key(share: &str, rel: &str) -> String {
    format!("{share}/{rel}")
}

fn to_chrono(ts: &S3Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl S3Backend {
    /// Build the SDK client from configuration and make sure the bucket
    /// exists, tolerating one that is already owned.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("S3 backend requires a bucket name"));
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "sharebox",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if !config.endpoint.is_empty() {
            loader = loader.endpoint_url(&config.endpoint);
        }
        let shared = loader.load().await;

        // Path-style addressing keeps MinIO-style endpoints working.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);

        let backend = Self {
            client,
            bucket: config.bucket.clone(),
            max_item_bytes: mb_to_bytes(config.max_file_mb),
            max_share_bytes: mb_to_bytes(config.max_share_mb),
            locks: ShareLocks::new(),
        };
        backend.ensure_bucket().await?;
        Ok(backend)
    }

    async fn ensure_bucket(&self) -> AppResult<()> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, "Created bucket");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_owned_by_you()
                    || service_err.is_bucket_already_exists()
                {
                    Ok(())
                } else {
                    Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to create bucket: {}", self.bucket),
                        service_err,
                    ))
                }
            }
        }
    }

    /// Resolve an item name to its path relative to the share prefix.
    fn item_rel(&self, item: &str) -> AppResult<String> {
        item_storage_path(item)
            .ok_or_else(|| AppError::invalid_item_name(format!("Invalid item name: {item}")))
    }

    async fn read_metadata(&self, share: &str) -> AppResult<Share> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(metadata_key(share))
            .send()
            .await
        {
            Ok(o) => o,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Err(AppError::share_not_found(format!("Share not found: {share}")));
                }
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read share metadata: {share}"),
                    service_err,
                ));
            }
        };

        let bytes = output.body.collect().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read share metadata body: {share}"),
                e,
            )
        })?;
        Ok(metadata::decode(&bytes.into_bytes())?.share)
    }

    async fn write_metadata(&self, share: &str, record: &Share) -> AppResult<()> {
        let bytes = metadata::encode(record)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(metadata_key(share))
            .body(S3Body::from(bytes))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to write share metadata: {share}"),
                    e,
                )
            })?;
        Ok(())
    }

    /// Enumerate the live item set of a share from a prefix listing:
    /// relative path, size, and modification time per object.
    async fn list_item_objects(
        &self,
        share: &str,
    ) -> AppResult<Vec<(String, u64, DateTime<Utc>)>> {
        let prefix = item_prefix(share);
        let mut found = Vec::new();

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to list share objects: {share}"),
                    e,
                )
            })?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let Some(rel) = key.strip_prefix(&prefix) else {
                    continue;
                };
                // Dotfiles never surface in listings or aggregates.
                if rel.is_empty() || rel.split('/').any(|s| s.starts_with('.')) {
                    continue;
                }
                let size = object.size().unwrap_or(0).max(0) as u64;
                let modified = object
                    .last_modified()
                    .map(to_chrono)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                found.push((rel.to_string(), size, modified));
            }
        }

        Ok(found)
    }

    /// Recompute `size`/`count` from the live item set and rewrite the
    /// metadata object. The caller must hold the share's lock.
    async fn update_aggregates(&self, share: &str) -> AppResult<()> {
        let items = self.list_item_objects(share).await?;
        let mut record = self.read_metadata(share).await?;

        record.size = items.iter().map(|(_, size, _)| size).sum();
        record.count = items.len() as u64;

        self.write_metadata(share, &record).await
    }

    async fn stat_item(&self, share: &str, item: &str) -> AppResult<Item> {
        let rel = self.item_rel(item)?;
        let key = item_key(share, &rel);

        let head = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(h) => h,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    return Err(AppError::item_not_found(format!(
                        "Item not found: {share}/{item}"
                    )));
                }
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat item: {share}/{item}"),
                    service_err,
                ));
            }
        };

        let date_modified = head
            .last_modified()
            .map(to_chrono)
            .unwrap_or_else(Utc::now);

        Ok(Item {
            path: key,
            info: ItemInfo {
                size: head.content_length().unwrap_or(0).max(0) as u64,
                date_modified,
            },
        })
    }

    fn spool_path() -> PathBuf {
        std::env::temp_dir().join(format!("sharebox-upload-{}", Uuid::new_v4()))
    }
}

#[async_trait]
impl ShareStore for S3Backend {
    fn backend_type(&self) -> &str {
        "s3"
    }

    async fn migrate(&self) -> AppResult<()> {
        let prefix = format!("{METADATA_ROOT}/");
        let mut upgraded = 0usize;

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to list share metadata", e)
            })?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if !key.ends_with(METADATA_OBJECT) {
                    continue;
                }

                let output = match self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                {
                    Ok(o) => o,
                    Err(_) => continue,
                };
                let bytes = match output.body.collect().await {
                    Ok(b) => b.into_bytes(),
                    Err(_) => continue,
                };
                let decoded = match metadata::decode(&bytes) {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(key, error = %e, "Skipping unreadable metadata record");
                        continue;
                    }
                };
                if !decoded.legacy {
                    continue;
                }

                let encoded = metadata::encode(&decoded.share)?;
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(S3Body::from(encoded))
                    .send()
                    .await
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Storage,
                            format!("Failed to rewrite metadata: {key}"),
                            e,
                        )
                    })?;
                upgraded += 1;
            }
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

        match self.read_metadata(name).await {
            Ok(_) => {
                return Err(AppError::share_already_exists(format!(
                    "Share already exists: {name}"
                )));
            }
            Err(e) if e.kind == ErrorKind::ShareNotFound => {}
            Err(e) => return Err(e),
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

        // Spool through a bounded local file: quota is enforced before any
        // byte reaches the bucket, and the final PutObject is all-or-nothing.
        let spool = Self::spool_path();
        let mut file = fs::File::create(&spool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to create upload spool", e)
        })?;

        let written = match copy_bounded(data, &window, &mut file).await {
            Ok(w) => w,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&spool).await;
                return Err(e);
            }
        };
        drop(file);

        if window.overflowed(written) {
            let _ = fs::remove_file(&spool).await;
            return Err(window.overflow_violation().into());
        }
        if written == 0 {
            let _ = fs::remove_file(&spool).await;
            return Err(AppError::empty_item(format!(
                "Upload produced no data: {share}/{item}"
            )));
        }

        let body = match S3Body::from_path(&spool).await {
            Ok(b) => b,
            Err(e) => {
                let _ = fs::remove_file(&spool).await;
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    "Failed to open upload spool",
                    e,
                ));
            }
        };

        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(item_key(share, &rel))
            .body(body)
            .content_length(written as i64)
            .send()
            .await;
        let _ = fs::remove_file(&spool).await;
        put.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to store item: {share}/{rel}"),
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

        let lock = self.locks.for_share(share);
        let _guard = lock.lock().await;

        // DeleteObject succeeds on absent keys; stat first so absence is an
        // ItemNotFound like the file backend.
        let existing = self.stat_item(share, item).await?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&existing.path)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete item: {share}/{item}"),
                    e,
                )
            })?;

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
        let prefix = format!("{METADATA_ROOT}/");
        let mut shares = Vec::new();

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to list shares", e)
            })?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if !key.ends_with(METADATA_OBJECT) {
                    continue;
                }

                // Records that fail to fetch or parse are skipped, not fatal.
                let output = match self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                {
                    Ok(o) => o,
                    Err(_) => continue,
                };
                let bytes = match output.body.collect().await {
                    Ok(b) => b.into_bytes(),
                    Err(_) => continue,
                };
                match metadata::decode(&bytes) {
                    Ok(decoded) => shares.push(decoded.share),
                    Err(_) => continue,
                }
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

        // Existence check: a missing share lists as ShareNotFound, not as
        // an empty result.
        self.read_metadata(name).await?;

        let mut items: Vec<Item> = self
            .list_item_objects(name)
            .await?
            .into_iter()
            .map(|(rel, size, date_modified)| Item {
                path: item_key(name, &rel),
                info: ItemInfo {
                    size,
                    date_modified,
                },
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

        self.read_metadata(name).await?;

        // Cascade: items first, metadata last. A failure partway leaves a
        // partially deleted share; there is no rollback.
        let items = self.list_item_objects(name).await?;
        for (rel, _, _) in &items {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(item_key(name, rel))
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to delete item: {name}/{rel}"),
                        e,
                    )
                })?;
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(metadata_key(name))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete share metadata: {name}"),
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

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(item_key(share, &rel))
            .send()
            .await
        {
            Ok(o) => o,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Err(AppError::item_not_found(format!(
                        "Item not found: {share}/{item}"
                    )));
                }
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open item: {share}/{item}"),
                    service_err,
                ));
            }
        };

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(metadata_key("demo"), "shares/demo/.metadata");
        assert_eq!(item_prefix("demo"), "demo/");
        assert_eq!(item_key("demo", "sub/file.txt"), "demo/sub/file.txt");
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = S3Timestamp::from_secs(1_700_000_000);
        let converted = to_chrono(&ts);
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
