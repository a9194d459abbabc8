//! Intermediate trie node records.
//!
//! Tables `TrieAccount` and `TrieStorage` cache branch nodes of the hashed
//! state trie. The key is the nibble path of the node, one nibble per byte;
//! storage keys are prefixed with `address_hash ++ incarnation`. The value is:
//!
//! ```text
//! be16(has_state) ++ be16(has_tree) ++ be16(has_hash) ++ [root_hash] ++ hashes
//! ```
//!
//! Bit `i` of each set refers to child nibble `i`:
//! - `has_state`: the child exists in the state.
//! - `has_tree`: the child has its own record in this table.
//! - `has_hash`: the child's hash is cached here, one entry in `hashes` per set
//!   bit, in nibble order.
//!
//! The root record of a storage trie (path of length zero) also stores the
//! storage root in `root_hash`.

use chainkv_types::{
    keys::HASHED_STORAGE_PREFIX_LENGTH,
    primitives::{H256, HASH_LENGTH},
};

use crate::api::ChaindataTable;

const HEADER_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrieNodeError {
    #[error("trie node of {len} bytes is shorter than its 6-byte header")]
    TooShort { len: usize },
    #[error("trie node hashes of {len} bytes are not a multiple of 32")]
    MisalignedHashes { len: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    pub has_state: u16,
    pub has_tree: u16,
    pub has_hash: u16,
    pub root_hash: Option<H256>,
    pub hashes: Vec<H256>,
}

impl TrieNode {
    pub fn encode(&self) -> Vec<u8> {
        let hash_count = self.hashes.len() + usize::from(self.root_hash.is_some());
        let mut out = Vec::with_capacity(HEADER_LENGTH + hash_count * HASH_LENGTH);
        out.extend_from_slice(&self.has_state.to_be_bytes());
        out.extend_from_slice(&self.has_tree.to_be_bytes());
        out.extend_from_slice(&self.has_hash.to_be_bytes());
        if let Some(root_hash) = &self.root_hash {
            out.extend_from_slice(root_hash.as_bytes());
        }
        for hash in &self.hashes {
            out.extend_from_slice(hash.as_bytes());
        }
        out
    }

    /// The leading hash is taken as `root_hash` when there is exactly one
    /// more hash than bits in `has_hash`.
    pub fn decode(bytes: &[u8]) -> Result<Self, TrieNodeError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(TrieNodeError::TooShort { len: bytes.len() });
        }
        let (header, body) = bytes.split_at(HEADER_LENGTH);
        if body.len() % HASH_LENGTH != 0 {
            return Err(TrieNodeError::MisalignedHashes { len: body.len() });
        }

        let has_state = u16::from_be_bytes([header[0], header[1]]);
        let has_tree = u16::from_be_bytes([header[2], header[3]]);
        let has_hash = u16::from_be_bytes([header[4], header[5]]);

        let mut hashes: Vec<H256> = body.chunks_exact(HASH_LENGTH).map(H256::from_slice).collect();
        let root_hash = if hashes.len() == has_hash.count_ones() as usize + 1 {
            Some(hashes.remove(0))
        } else {
            None
        };

        Ok(Self {
            has_state,
            has_tree,
            has_hash,
            root_hash,
            hashes,
        })
    }
}

/// Which trie a table caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieKind {
    Accounts,
    Storage,
}

impl TrieKind {
    /// Bytes before the nibble path.
    pub const fn prefix_len(self) -> usize {
        match self {
            TrieKind::Accounts => 0,
            TrieKind::Storage => HASHED_STORAGE_PREFIX_LENGTH,
        }
    }

    /// Shortest stored path. The account trie root has no record.
    pub const fn min_path_len(self) -> usize {
        match self {
            TrieKind::Accounts => 1,
            TrieKind::Storage => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieLayout {
    pub table: &'static str,
    pub kind: TrieKind,
}

impl TrieLayout {
    pub const ACCOUNT_TRIE: Self = Self {
        table: ChaindataTable::TrieOfAccounts.name(),
        kind: TrieKind::Accounts,
    };
    pub const STORAGE_TRIE: Self = Self {
        table: ChaindataTable::TrieOfStorage.name(),
        kind: TrieKind::Storage,
    };

    pub fn for_table(table: &str) -> Option<Self> {
        [Self::ACCOUNT_TRIE, Self::STORAGE_TRIE]
            .into_iter()
            .find(|layout| layout.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let node = TrieNode {
            has_state: 0b1011,
            has_tree: 0b0001,
            has_hash: 0b1000,
            root_hash: None,
            hashes: vec![H256::repeat_byte(0x22)],
        };
        let encoded = node.encode();
        assert_eq!(hex::encode(&encoded[..HEADER_LENGTH]), "000b00010008");
        assert_eq!(&encoded[HEADER_LENGTH..], H256::repeat_byte(0x22).as_bytes());
        assert_eq!(TrieNode::decode(&encoded).unwrap(), node);
    }

    #[test]
    fn root_hash_inferred_from_count() {
        let node = TrieNode {
            has_state: 0b11,
            has_tree: 0,
            has_hash: 0b01,
            root_hash: Some(H256::repeat_byte(0xee)),
            hashes: vec![H256::repeat_byte(0x01)],
        };
        let decoded = TrieNode::decode(&node.encode()).unwrap();
        assert_eq!(decoded.root_hash, Some(H256::repeat_byte(0xee)));
        assert_eq!(decoded.hashes, [H256::repeat_byte(0x01)]);
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(
            TrieNode::decode(&[0, 1, 0]).unwrap_err(),
            TrieNodeError::TooShort { len: 3 }
        );
        assert_eq!(
            TrieNode::decode(&[0; HEADER_LENGTH + 31]).unwrap_err(),
            TrieNodeError::MisalignedHashes { len: 31 }
        );
    }

    #[test]
    fn layouts() {
        assert_eq!(TrieLayout::for_table("TrieAccount"), Some(TrieLayout::ACCOUNT_TRIE));
        assert_eq!(TrieLayout::for_table("TrieStorage"), Some(TrieLayout::STORAGE_TRIE));
        assert_eq!(TrieLayout::for_table("PlainState"), None);
        assert_eq!(TrieKind::Storage.prefix_len(), 40);
    }
}
