//! Well-known keys stored in metadata tables.

use std::fmt;

/// Key of the schema version in [`super::ChaindataTable::DatabaseInfo`]. Its
/// value is a [`SchemaVersion`] encoded with [`SchemaVersion::to_bytes`].
pub const DB_SCHEMA_VERSION_KEY: &[u8] = b"dbVersion";

/// Schema version written by this code.
///
/// - 5.0: `BlockTransaction` holds canonical ids; transactions of non-canonical
///   blocks move to `NonCanonicalTransaction`.
/// - 6.0: `BlockTransaction` holds system transactions before and after each
///   block.
pub const DB_SCHEMA_VERSION: SchemaVersion = SchemaVersion::new(6, 0, 0);

// ============ Prune Settings ============

pub const PRUNE_TYPE_OLDER: &[u8] = b"older";
pub const PRUNE_TYPE_BEFORE: &[u8] = b"before";

pub const PRUNE_HISTORY: &[u8] = b"pruneHistory";
pub const PRUNE_HISTORY_TYPE: &[u8] = b"pruneHistoryType";
pub const PRUNE_RECEIPTS: &[u8] = b"pruneReceipts";
pub const PRUNE_RECEIPTS_TYPE: &[u8] = b"pruneReceiptsType";
pub const PRUNE_TX_INDEX: &[u8] = b"pruneTxIndex";
pub const PRUNE_TX_INDEX_TYPE: &[u8] = b"pruneTxIndexType";
pub const PRUNE_CALL_TRACES: &[u8] = b"pruneCallTraces";
pub const PRUNE_CALL_TRACES_TYPE: &[u8] = b"pruneCallTracesType";

// ============ Snapshots ============

/// Whether EVM code is translated to TEVM.
pub const STORAGE_MODE_TEVM: &[u8] = b"smTEVM";

pub const BITTORRENT_PEER_ID: &[u8] = b"peerID";
pub const CURRENT_HEADERS_SNAPSHOT_HASH: &[u8] = b"CurrentHeadersSnapshotHash";
pub const CURRENT_HEADERS_SNAPSHOT_BLOCK: &[u8] = b"CurrentHeadersSnapshotBlock";
pub const CURRENT_BODIES_SNAPSHOT_HASH: &[u8] = b"CurrentBodiesSnapshotHash";
pub const CURRENT_BODIES_SNAPSHOT_BLOCK: &[u8] = b"CurrentBodiesSnapshotBlock";

/// Version of the on-disk layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    pub const ENCODED_LENGTH: usize = 12;

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Layout: major (4 bytes BE) || minor (4 bytes BE) || patch (4 bytes BE)
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LENGTH] {
        let mut bytes = [0u8; Self::ENCODED_LENGTH];
        bytes[..4].copy_from_slice(&self.major.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.minor.to_be_bytes());
        bytes[8..].copy_from_slice(&self.patch.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; Self::ENCODED_LENGTH] = bytes.try_into().ok()?;
        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Some(Self::new(word(0), word(4), word(8)))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_encoding() {
        let bytes = DB_SCHEMA_VERSION.to_bytes();
        assert_eq!(hex::encode(bytes), "000000060000000000000000");
        assert_eq!(SchemaVersion::from_bytes(&bytes), Some(DB_SCHEMA_VERSION));
        assert_eq!(SchemaVersion::from_bytes(&bytes[..8]), None);
        assert_eq!(DB_SCHEMA_VERSION.to_string(), "6.0.0");
    }

    #[test]
    fn schema_versions_order() {
        assert!(SchemaVersion::new(5, 9, 9) < SchemaVersion::new(6, 0, 0));
    }
}
