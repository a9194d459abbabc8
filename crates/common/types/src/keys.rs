//! Builders for composite keys shared by several tables.
//!
//! All integers are big-endian so that byte order matches numeric order.

use crate::primitives::{
    ADDRESS_LENGTH, Address, BLOCK_NUMBER_LENGTH, BlockNumber, HASH_LENGTH, H256,
    INCARNATION_LENGTH, Incarnation,
};

/// `address ++ incarnation`
pub const PLAIN_STORAGE_PREFIX_LENGTH: usize = ADDRESS_LENGTH + INCARNATION_LENGTH;
/// `address ++ incarnation ++ storage_key`
pub const PLAIN_STORAGE_KEY_LENGTH: usize = PLAIN_STORAGE_PREFIX_LENGTH + HASH_LENGTH;
/// `address_hash ++ incarnation`
pub const HASHED_STORAGE_PREFIX_LENGTH: usize = HASH_LENGTH + INCARNATION_LENGTH;
/// `address_hash ++ incarnation ++ storage_key_hash`
pub const HASHED_STORAGE_KEY_LENGTH: usize = HASHED_STORAGE_PREFIX_LENGTH + HASH_LENGTH;

pub fn encode_block_number(number: BlockNumber) -> [u8; BLOCK_NUMBER_LENGTH] {
    number.to_be_bytes()
}

/// Returns `None` unless `bytes` is exactly 8 bytes long.
pub fn decode_block_number(bytes: &[u8]) -> Option<BlockNumber> {
    bytes.try_into().ok().map(BlockNumber::from_be_bytes)
}

pub fn plain_storage_prefix(address: &Address, incarnation: Incarnation) -> Vec<u8> {
    let mut key = Vec::with_capacity(PLAIN_STORAGE_PREFIX_LENGTH);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&incarnation.to_be_bytes());
    key
}

pub fn plain_storage_key(address: &Address, incarnation: Incarnation, location: &H256) -> Vec<u8> {
    let mut key = plain_storage_prefix(address, incarnation);
    key.extend_from_slice(location.as_bytes());
    key
}

pub fn hashed_storage_prefix(address_hash: &H256, incarnation: Incarnation) -> Vec<u8> {
    let mut key = Vec::with_capacity(HASHED_STORAGE_PREFIX_LENGTH);
    key.extend_from_slice(address_hash.as_bytes());
    key.extend_from_slice(&incarnation.to_be_bytes());
    key
}

pub fn hashed_storage_key(
    address_hash: &H256,
    incarnation: Incarnation,
    location_hash: &H256,
) -> Vec<u8> {
    let mut key = hashed_storage_prefix(address_hash, incarnation);
    key.extend_from_slice(location_hash.as_bytes());
    key
}

/// Key of a `StorageChangeSet` record: `block_number ++ address ++ incarnation`.
pub fn storage_change_set_prefix(
    number: BlockNumber,
    address: &Address,
    incarnation: Incarnation,
) -> Vec<u8> {
    let mut key = encode_block_number(number).to_vec();
    key.extend_from_slice(&plain_storage_prefix(address, incarnation));
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_storage_key_layout() {
        let address = Address::repeat_byte(0xaa);
        let location = H256::repeat_byte(0x11);
        let key = plain_storage_key(&address, 2, &location);

        assert_eq!(key.len(), PLAIN_STORAGE_KEY_LENGTH);
        assert_eq!(&key[..20], address.as_bytes());
        assert_eq!(hex::encode(&key[20..28]), "0000000000000002");
        assert_eq!(&key[28..], location.as_bytes());
    }

    #[test]
    fn hashed_storage_key_layout() {
        let key = hashed_storage_key(&H256::repeat_byte(1), 1, &H256::repeat_byte(2));
        assert_eq!(key.len(), HASHED_STORAGE_KEY_LENGTH);
        assert_eq!(&key[..HASHED_STORAGE_PREFIX_LENGTH], hashed_storage_prefix(&H256::repeat_byte(1), 1));
    }

    #[test]
    fn block_numbers_sort_numerically() {
        assert!(encode_block_number(255) < encode_block_number(256));
        assert_eq!(decode_block_number(&encode_block_number(42)), Some(42));
        assert_eq!(decode_block_number(&[1, 2, 3]), None);
    }

    #[test]
    fn storage_change_set_prefix_starts_with_block() {
        let key = storage_change_set_prefix(7, &Address::zero(), 1);
        assert_eq!(key.len(), 8 + PLAIN_STORAGE_PREFIX_LENGTH);
        assert_eq!(decode_block_number(&key[..8]), Some(7));
    }
}
