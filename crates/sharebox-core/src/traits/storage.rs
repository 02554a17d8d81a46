//! Share storage trait for pluggable storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use sharebox_entity::item::Item;
use sharebox_entity::share::{Options, Share};

use crate::result::AppResult;

/// A byte stream type used for reading and writing item contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for share storage backends.
///
/// Implementations exist for the local filesystem and S3-compatible object
/// stores. The trait is defined here in `sharebox-core` and implemented in
/// `sharebox-storage`; consumers receive one `dyn ShareStore` built at
/// startup from configuration.
///
/// Every method validates the names it receives before touching storage and
/// reports failures through the sentinel [`ErrorKind`]s.
///
/// [`ErrorKind`]: crate::error::ErrorKind
#[async_trait]
pub trait ShareStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g., "file", "s3").
    fn backend_type(&self) -> &str;

    /// Rewrite stored metadata written by a previous schema version.
    ///
    /// Called once at startup. Must be idempotent: running it twice yields
    /// the same records as running it once.
    async fn migrate(&self) -> AppResult<()>;

    /// Create a new share. Fails with `ShareAlreadyExists` when the name is
    /// taken.
    async fn create_share(&self, name: &str, owner: &str, options: Options) -> AppResult<Share>;

    /// Replace the options of an existing share wholesale; name, owner,
    /// creation date, and aggregates are preserved.
    async fn update_share(&self, name: &str, options: Options) -> AppResult<Options>;

    /// Stream a new item into a share, bounded by the configured quotas.
    ///
    /// `declared_size` of 0 means the caller does not know the size upfront.
    /// An item of exactly the remaining capacity is accepted; anything more
    /// is rejected and the partial artifact removed. Writing over an
    /// existing item name silently replaces it.
    async fn create_item(
        &self,
        share: &str,
        item: &str,
        declared_size: u64,
        data: ByteStream,
    ) -> AppResult<Item>;

    /// Delete an item. Fails with `ItemNotFound` when absent.
    async fn delete_item(&self, share: &str, item: &str) -> AppResult<()>;

    /// Fetch the metadata record of a single share.
    async fn get_share(&self, name: &str) -> AppResult<Share>;

    /// List all shares, newest first.
    async fn list_shares(&self) -> AppResult<Vec<Share>>;

    /// List the items of a share, most recently modified first.
    async fn list_share(&self, name: &str) -> AppResult<Vec<Item>>;

    /// Delete a share and all of its items.
    async fn delete_share(&self, name: &str) -> AppResult<()>;

    /// Fetch a single item's metadata.
    async fn get_item(&self, share: &str, item: &str) -> AppResult<Item>;

    /// Open an item's content for streaming download.
    async fn get_item_data(&self, share: &str, item: &str) -> AppResult<ByteStream>;
}
