//! Item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable file-like artifact stored inside a share.
///
/// Items have no identity beyond their path: there is no update operation,
/// only create and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// `share/item` path identifying the artifact within the backend.
    pub path: String,
    /// Size and modification metadata.
    pub info: ItemInfo,
}

/// Stat-level metadata of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Size in bytes.
    pub size: u64,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}
