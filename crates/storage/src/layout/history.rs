//! Sharded history indices.
//!
//! Each entity (an account, a storage slot, a call trace address) owns a list
//! of shards keyed by `entity ++ suffix`:
//!
//! ```text
//! entity ++ be(max block in shard)   -> bitmap
//! entity ++ be(max block in shard)   -> bitmap
//! entity ++ ff ff ff ff ff ff ff ff  -> bitmap   (open shard, exactly one)
//! ```
//!
//! Finding the shard that covers block `n` is a single seek to
//! `entity ++ be(n)`: the first key at or after it belongs to the shard whose
//! upper bound is the smallest one that is still `>= n`.

use chainkv_types::primitives::{ADDRESS_LENGTH, BlockNumber, HASH_LENGTH};

use crate::api::ChaindataTable;

pub const SHARD_SUFFIX_LENGTH: usize = 8;

/// Suffix of the last shard of every entity.
pub const LAST_SHARD_SUFFIX: [u8; SHARD_SUFFIX_LENGTH] = [0xff; SHARD_SUFFIX_LENGTH];

/// Upper bound on the encoded size of one shard's bitmap.
pub const SHARD_SIZE_LIMIT: usize = 2048;

/// The part of a shard key after the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShardSuffix {
    /// A closed shard holding blocks up to and including this one.
    UpTo(BlockNumber),
    /// The open shard new blocks are appended to.
    Last,
}

impl ShardSuffix {
    /// `UpTo(u64::MAX)` encodes like `Last`.
    pub fn to_bytes(self) -> [u8; SHARD_SUFFIX_LENGTH] {
        match self {
            ShardSuffix::UpTo(number) => number.to_be_bytes(),
            ShardSuffix::Last => LAST_SHARD_SUFFIX,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; SHARD_SUFFIX_LENGTH] = bytes.try_into().ok()?;
        Some(if bytes == LAST_SHARD_SUFFIX {
            ShardSuffix::Last
        } else {
            ShardSuffix::UpTo(BlockNumber::from_be_bytes(bytes))
        })
    }
}

pub fn shard_key(entity: &[u8], suffix: ShardSuffix) -> Vec<u8> {
    let mut key = Vec::with_capacity(entity.len() + SHARD_SUFFIX_LENGTH);
    key.extend_from_slice(entity);
    key.extend_from_slice(&suffix.to_bytes());
    key
}

/// Splits a shard key into entity and suffix. `None` if the key length doesn't
/// match `entity_len`.
pub fn split_shard_key(key: &[u8], entity_len: usize) -> Option<(&[u8], ShardSuffix)> {
    if key.len() != entity_len + SHARD_SUFFIX_LENGTH {
        return None;
    }
    let (entity, suffix) = key.split_at(entity_len);
    Some((entity, ShardSuffix::from_bytes(suffix)?))
}

/// A table following the shard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLayout {
    pub table: &'static str,
    pub entity_len: usize,
}

impl HistoryLayout {
    /// `address -> blocks where the account changed`
    pub const ACCOUNTS_HISTORY: Self = Self {
        table: ChaindataTable::AccountsHistory.name(),
        entity_len: ADDRESS_LENGTH,
    };
    /// `address ++ location -> blocks where the slot changed`
    pub const STORAGE_HISTORY: Self = Self {
        table: ChaindataTable::StorageHistory.name(),
        entity_len: ADDRESS_LENGTH + HASH_LENGTH,
    };
    /// `address -> blocks with a call from it`
    pub const CALL_FROM_INDEX: Self = Self {
        table: ChaindataTable::CallFromIndex.name(),
        entity_len: ADDRESS_LENGTH,
    };
    /// `address -> blocks with a call to it`
    pub const CALL_TO_INDEX: Self = Self {
        table: ChaindataTable::CallToIndex.name(),
        entity_len: ADDRESS_LENGTH,
    };

    pub const fn key_len(&self) -> usize {
        self.entity_len + SHARD_SUFFIX_LENGTH
    }

    /// Layout of a table by its name.
    pub fn for_table(table: &str) -> Option<Self> {
        HISTORY_LAYOUTS
            .iter()
            .copied()
            .find(|layout| layout.table == table)
    }
}

pub const HISTORY_LAYOUTS: [HistoryLayout; 4] = [
    HistoryLayout::ACCOUNTS_HISTORY,
    HistoryLayout::STORAGE_HISTORY,
    HistoryLayout::CALL_FROM_INDEX,
    HistoryLayout::CALL_TO_INDEX,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_order_matches_block_order() {
        let suffixes = [
            ShardSuffix::UpTo(0),
            ShardSuffix::UpTo(255),
            ShardSuffix::UpTo(256),
            ShardSuffix::UpTo(u64::MAX - 1),
            ShardSuffix::Last,
        ];
        assert!(
            suffixes
                .windows(2)
                .all(|pair| pair[0].to_bytes() < pair[1].to_bytes())
        );
    }

    #[test]
    fn last_suffix_is_all_ones() {
        assert_eq!(ShardSuffix::Last.to_bytes(), LAST_SHARD_SUFFIX);
        assert_eq!(
            ShardSuffix::from_bytes(&LAST_SHARD_SUFFIX),
            Some(ShardSuffix::Last)
        );
        assert_eq!(
            ShardSuffix::from_bytes(&1000u64.to_be_bytes()),
            Some(ShardSuffix::UpTo(1000))
        );
        assert_eq!(ShardSuffix::from_bytes(&[0xff; 7]), None);
    }

    #[test]
    fn split_checks_length() {
        let entity = [0xaa; ADDRESS_LENGTH];
        let key = shard_key(&entity, ShardSuffix::UpTo(42));
        assert_eq!(key.len(), HistoryLayout::ACCOUNTS_HISTORY.key_len());

        let (split_entity, suffix) = split_shard_key(&key, ADDRESS_LENGTH).unwrap();
        assert_eq!(split_entity, entity);
        assert_eq!(suffix, ShardSuffix::UpTo(42));

        assert_eq!(split_shard_key(&key, ADDRESS_LENGTH + HASH_LENGTH), None);
    }

    #[test]
    fn layouts_name_real_tables() {
        for layout in HISTORY_LAYOUTS {
            assert!(ChaindataTable::from_name(layout.table).is_some());
            assert_eq!(HistoryLayout::for_table(layout.table), Some(layout));
        }
        assert_eq!(HistoryLayout::STORAGE_HISTORY.key_len(), 60);
    }
}
