//! Share entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written by both backends for new and migrated records.
pub const METADATA_VERSION: u32 = 1;

/// Policy controlling what unauthenticated visitors of a share may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// Visitors may upload items.
    #[default]
    Upload,
    /// Visitors may download items.
    Download,
    /// Visitors may upload and download.
    Both,
}

/// Caller-settable share options, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Days the share stays valid after creation (0 = never expires).
    #[serde(default)]
    pub validity: i64,
    /// Exposure policy for unauthenticated visitors.
    #[serde(default)]
    pub exposure: Exposure,
    /// Free-form description shown to the owner.
    #[serde(default)]
    pub description: String,
    /// Message shown to visitors of the share.
    #[serde(default)]
    pub message: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            validity: 7,
            exposure: Exposure::Upload,
            description: String::new(),
            message: String::new(),
        }
    }
}

impl Options {
    /// The all-zero record, distinct from [`Options::default`] which carries
    /// the validity applied to newly created shares.
    pub fn zero() -> Self {
        Self {
            validity: 0,
            exposure: Exposure::Upload,
            description: String::new(),
            message: String::new(),
        }
    }
}

/// A named, owned container for items, with expiry and exposure policy.
///
/// `size` and `count` are caches over the live item set, recomputed by the
/// backend after every item mutation. They are never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Metadata schema version.
    pub version: u32,
    /// Unique share name within a backend.
    pub name: String,
    /// Creation timestamp.
    #[serde(rename = "created")]
    pub date_created: DateTime<Utc>,
    /// Authenticated user who created the share (empty for anonymous).
    #[serde(default)]
    pub owner: String,
    /// Caller-settable options.
    #[serde(default = "Options::zero")]
    pub options: Options,
    /// Aggregate item bytes.
    #[serde(default)]
    pub size: u64,
    /// Aggregate item count.
    #[serde(default)]
    pub count: u64,
}

impl Share {
    /// Build a fresh share record at the current schema version.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, options: Options) -> Self {
        Self {
            version: METADATA_VERSION,
            name: name.into(),
            date_created: Utc::now(),
            owner: owner.into(),
            options,
            size: 0,
            count: 0,
        }
    }

    /// A share expires `validity` days after creation; 0 never expires.
    /// Validity is always computed from `date_created`, never stored.
    pub fn is_valid(&self) -> bool {
        if self.options.validity == 0 {
            return true;
        }
        self.date_created + Duration::days(self.options.validity) > Utc::now()
    }
}

/// Projection of a share safe to return to unauthenticated callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicShare {
    /// Share name.
    pub name: String,
    /// Exposure policy.
    pub exposure: Exposure,
    /// Message shown to visitors.
    pub message: String,
}

impl PublicShare {
    /// Build the public projection of a share.
    pub fn for_share(share: &Share) -> Self {
        Self {
            name: share.name.clone(),
            exposure: share.options.exposure,
            message: share.options.message.clone(),
        }
    }
}
