//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Convert a configured megabyte limit to bytes; 0 stays "unlimited".
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb * 1024 * 1024
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to construct: `"file"` or `"s3"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Validity in days applied to shares created without explicit options
    /// (0 = never expires).
    #[serde(default = "default_validity_days")]
    pub default_validity_days: i64,
    /// Local filesystem backend configuration.
    #[serde(default)]
    pub file: FileStorageConfig,
    /// S3-compatible backend configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            default_validity_days: default_validity_days(),
            file: FileStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    /// Root directory where shares and items are stored.
    #[serde(default = "default_file_path")]
    pub path: String,
    /// Maximum item size in MB (0 = unlimited).
    #[serde(default)]
    pub max_file_mb: u64,
    /// Maximum share size in MB (0 = unlimited).
    #[serde(default)]
    pub max_share_mb: u64,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            path: default_file_path(),
            max_file_mb: 0,
            max_share_mb: 0,
        }
    }
}

/// S3-compatible object storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3StorageConfig {
    /// Endpoint URL for non-AWS stores (e.g. MinIO); empty uses AWS.
    #[serde(default)]
    pub endpoint: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Maximum item size in MB (0 = unlimited).
    #[serde(default)]
    pub max_file_mb: u64,
    /// Maximum share size in MB (0 = unlimited).
    #[serde(default)]
    pub max_share_mb: u64,
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_validity_days() -> i64 {
    7
}

fn default_file_path() -> String {
    "./data/shares".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}
