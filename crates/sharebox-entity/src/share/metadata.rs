//! Versioned JSON codec for the stored share record.
//!
//! Both backends persist a share as one JSON document:
//! `{version, name, owner, created, options{...}, size, count}`. Records
//! written before the schema was versioned carry no `version` field and may
//! keep `validity`/`exposure` at the top level instead of a nested `options`
//! object; [`decode`] normalizes them and reports that a rewrite is due.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::share::model::{Exposure, METADATA_VERSION, Options, Share};

/// Result of decoding a stored metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedShare {
    /// The record, normalized to the current schema.
    pub share: Share,
    /// True when the stored bytes predate the versioned schema and should
    /// be rewritten.
    pub legacy: bool,
}

/// Superset of every schema the stores have ever written.
#[derive(Debug, Deserialize)]
struct StoredShare {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    name: String,
    #[serde(rename = "created")]
    date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    owner: String,
    options: Option<Options>,
    // Pre-versioning records kept these two at the top level.
    #[serde(default)]
    validity: i64,
    exposure: Option<Exposure>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    count: u64,
}

/// Serialize a share record at the current schema version.
pub fn encode(share: &Share) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(share)
}

/// Deserialize a stored record, upgrading legacy schemas.
///
/// A record is legacy iff its `version` field is absent or 0. Upgrading
/// keeps a non-empty nested `options` object when present, otherwise
/// synthesizes options from the legacy top-level fields; missing fields
/// normalize to zero values. Decoding a current record is the identity, so
/// upgrade-then-decode is idempotent.
pub fn decode(bytes: &[u8]) -> serde_json::Result<DecodedShare> {
    let raw: StoredShare = serde_json::from_slice(bytes)?;
    let legacy = raw.version == 0;

    let options = match raw.options {
        Some(o) if !legacy || o != Options::zero() => o,
        _ => Options {
            validity: raw.validity,
            exposure: raw.exposure.unwrap_or_default(),
            ..Options::zero()
        },
    };

    let share = Share {
        version: if legacy { METADATA_VERSION } else { raw.version },
        name: raw.name,
        date_created: raw.date_created.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        owner: raw.owner,
        options,
        size: raw.size,
        count: raw.count,
    };

    Ok(DecodedShare { share, legacy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pre_versioning_record() {
        // No `version`, options at the top level.
        let fixture = br#"{
            "name": "oldshare",
            "owner": "alice",
            "created": "2023-04-01T10:00:00Z",
            "validity": 30,
            "exposure": "download",
            "size": 42,
            "count": 2
        }"#;

        let decoded = decode(fixture).unwrap();
        assert!(decoded.legacy);
        assert_eq!(decoded.share.version, METADATA_VERSION);
        assert_eq!(decoded.share.name, "oldshare");
        assert_eq!(decoded.share.owner, "alice");
        assert_eq!(decoded.share.options.validity, 30);
        assert_eq!(decoded.share.options.exposure, Exposure::Download);
        assert_eq!(decoded.share.size, 42);
        assert_eq!(decoded.share.count, 2);
    }

    #[test]
    fn test_decode_legacy_record_prefers_nested_options() {
        // Unversioned, but already carries a populated options object.
        let fixture = br#"{
            "name": "mixed",
            "created": "2023-04-01T10:00:00Z",
            "validity": 3,
            "options": {"validity": 14, "exposure": "both", "message": "hi"}
        }"#;

        let decoded = decode(fixture).unwrap();
        assert!(decoded.legacy);
        assert_eq!(decoded.share.options.validity, 14);
        assert_eq!(decoded.share.options.exposure, Exposure::Both);
        assert_eq!(decoded.share.options.message, "hi");
    }

    #[test]
    fn test_decode_current_record_is_identity() {
        // Looks legacy (top-level validity) but carries a version: current.
        let fixture = br#"{
            "version": 1,
            "name": "current",
            "owner": "bob",
            "created": "2024-01-15T08:30:00Z",
            "validity": 99,
            "options": {"validity": 7, "exposure": "upload"},
            "size": 10,
            "count": 1
        }"#;

        let decoded = decode(fixture).unwrap();
        assert!(!decoded.legacy);
        assert_eq!(decoded.share.version, 1);
        assert_eq!(decoded.share.options.validity, 7);

        // Round trip through the current encoder stays current and equal.
        let reencoded = encode(&decoded.share).unwrap();
        let again = decode(&reencoded).unwrap();
        assert!(!again.legacy);
        assert_eq!(again.share, decoded.share);
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let fixture = br#"{"name": "old", "validity": 5, "exposure": "upload", "created": "2023-01-01T00:00:00Z"}"#;

        let first = decode(fixture).unwrap();
        assert!(first.legacy);

        let rewritten = encode(&first.share).unwrap();
        let second = decode(&rewritten).unwrap();
        assert!(!second.legacy);
        assert_eq!(second.share, first.share);
    }

    #[test]
    fn test_missing_fields_normalize_to_zero_values() {
        let fixture = br#"{"name": "bare"}"#;

        let decoded = decode(fixture).unwrap();
        assert!(decoded.legacy);
        assert_eq!(decoded.share.owner, "");
        assert_eq!(decoded.share.options, Options::zero());
        assert_eq!(decoded.share.size, 0);
        assert_eq!(decoded.share.count, 0);
        assert_eq!(decoded.share.date_created, DateTime::<Utc>::UNIX_EPOCH);
    }
}
