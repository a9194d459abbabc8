//! Automatic DupSort key conversion.
//!
//! The storage engine only compares the physical key of a DupSort table, so a
//! table whose logical keys are wider than that window stores them split: the
//! first `to_len` bytes stay in the key and the remaining suffix is moved to the
//! front of the value. All values under one physical key are then ordered by
//! that suffix, which keeps the logical order intact.
//!
//! ```text
//! logical:   [address | incarnation | location]  ->  [value]
//! physical:  [address | incarnation]             ->  [location | value]
//! ```
//!
//! Keys of any other length are stored as they are, which lets one table hold
//! both shapes (e.g. accounts and storage slots in `PlainState`). The only
//! length that is rejected is `to_len` itself: such a key would read back as a
//! split key.

use std::borrow::Cow;

use super::{DupSortConversion, TableConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DupSortError {
    #[error("logical key of {len} bytes collides with the physical prefix length of the table")]
    AmbiguousKey { len: usize },
    #[error("physical value of {len} bytes is shorter than the {expected}-byte key suffix")]
    ValueTooShort { len: usize, expected: usize },
}

/// Converts a logical pair into the pair written to the engine.
///
/// The physical key always borrows from `key`; only a split value allocates.
pub fn encode<'a>(
    config: &TableConfig,
    key: &'a [u8],
    value: &'a [u8],
) -> Result<(&'a [u8], Cow<'a, [u8]>), DupSortError> {
    match config.dup_sort_conversion {
        Some(conversion) => conversion.encode(key, value),
        None => Ok((key, Cow::Borrowed(value))),
    }
}

/// Converts a pair read from the engine back into its logical form.
pub fn decode<'a>(
    config: &TableConfig,
    key: &'a [u8],
    value: &'a [u8],
) -> Result<(Cow<'a, [u8]>, &'a [u8]), DupSortError> {
    match config.dup_sort_conversion {
        Some(conversion) => conversion.decode(key, value),
        None => Ok((Cow::Borrowed(key), value)),
    }
}

impl DupSortConversion {
    pub fn encode<'a>(
        &self,
        key: &'a [u8],
        value: &'a [u8],
    ) -> Result<(&'a [u8], Cow<'a, [u8]>), DupSortError> {
        if key.len() == self.from_len {
            let (prefix, suffix) = key.split_at(self.to_len);
            let mut physical = Vec::with_capacity(suffix.len() + value.len());
            physical.extend_from_slice(suffix);
            physical.extend_from_slice(value);
            return Ok((prefix, Cow::Owned(physical)));
        }
        if key.len() == self.to_len {
            return Err(DupSortError::AmbiguousKey { len: key.len() });
        }
        Ok((key, Cow::Borrowed(value)))
    }

    pub fn decode<'a>(
        &self,
        key: &'a [u8],
        value: &'a [u8],
    ) -> Result<(Cow<'a, [u8]>, &'a [u8]), DupSortError> {
        if key.len() != self.to_len {
            return Ok((Cow::Borrowed(key), value));
        }
        let suffix_len = self.suffix_len();
        if value.len() < suffix_len {
            return Err(DupSortError::ValueTooShort {
                len: value.len(),
                expected: suffix_len,
            });
        }
        let (suffix, value) = value.split_at(suffix_len);
        let mut logical = Vec::with_capacity(self.from_len);
        logical.extend_from_slice(key);
        logical.extend_from_slice(suffix);
        Ok((Cow::Owned(logical), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TableFlags;

    fn plain_state() -> TableConfig {
        TableConfig::dup_sort().with_conversion(60, 28)
    }

    /// Deterministic pseudo-random bytes, enough to vary keys between cases.
    fn bytes(seed: u64, len: usize) -> Vec<u8> {
        let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state as u8
            })
            .collect()
    }

    #[test]
    fn splits_wide_keys() {
        let key: Vec<u8> = (0..60).collect();
        let (physical_key, physical_value) = encode(&plain_state(), &key, b"slot").unwrap();

        assert_eq!(physical_key, &key[..28]);
        assert_eq!(&physical_value[..32], &key[28..]);
        assert_eq!(&physical_value[32..], b"slot");
    }

    #[test]
    fn round_trip_plain_state_layout() {
        let config = plain_state();
        for seed in 0..64 {
            let key = bytes(seed, 60);
            let value = bytes(seed + 1000, (seed % 40) as usize);

            let (physical_key, physical_value) = encode(&config, &key, &value).unwrap();
            let (logical_key, logical_value) =
                decode(&config, physical_key, &physical_value).unwrap();

            assert_eq!(logical_key.as_ref(), key.as_slice());
            assert_eq!(logical_value, value.as_slice());
        }
    }

    #[test]
    fn round_trip_hashed_storage_layout() {
        let config = TableConfig::dup_sort().with_conversion(72, 40);
        let key = bytes(7, 72);
        let (physical_key, physical_value) = encode(&config, &key, &[]).unwrap();
        assert_eq!(physical_key.len(), 40);
        assert_eq!(physical_value.len(), 32);

        let (logical_key, logical_value) = decode(&config, physical_key, &physical_value).unwrap();
        assert_eq!(logical_key.as_ref(), key.as_slice());
        assert!(logical_value.is_empty());
    }

    #[test]
    fn identity_without_conversion() {
        let configs = [
            TableConfig::default(),
            TableConfig::dup_sort(),
            TableConfig::new(TableFlags::INTEGER_KEY | TableFlags::REVERSE_DUP),
        ];
        for config in configs {
            for seed in 0..16 {
                let key = bytes(seed, seed as usize * 5);
                let value = bytes(seed + 99, 33);

                let (physical_key, physical_value) = encode(&config, &key, &value).unwrap();
                assert_eq!(physical_key, key.as_slice());
                assert!(matches!(physical_value, Cow::Borrowed(_)));
                assert_eq!(physical_value.as_ref(), value.as_slice());

                let (logical_key, logical_value) = decode(&config, &key, &value).unwrap();
                assert_eq!(logical_key.as_ref(), key.as_slice());
                assert_eq!(logical_value, value.as_slice());
            }
        }
    }

    #[test]
    fn other_lengths_pass_through() {
        // Account records of PlainState use 20-byte keys.
        let address = bytes(3, 20);
        let (physical_key, physical_value) = encode(&plain_state(), &address, b"account").unwrap();
        assert_eq!(physical_key, address.as_slice());
        assert_eq!(physical_value.as_ref(), b"account");

        let (logical_key, logical_value) = decode(&plain_state(), &address, b"account").unwrap();
        assert_eq!(logical_key.as_ref(), address.as_slice());
        assert_eq!(logical_value, b"account");
    }

    #[test]
    fn rejects_ambiguous_keys() {
        let key = bytes(5, 28);
        assert_eq!(
            encode(&plain_state(), &key, b"v").unwrap_err(),
            DupSortError::AmbiguousKey { len: 28 }
        );
    }

    #[test]
    fn rejects_truncated_values() {
        let key = bytes(5, 28);
        assert_eq!(
            decode(&plain_state(), &key, &[0u8; 31]).unwrap_err(),
            DupSortError::ValueTooShort {
                len: 31,
                expected: 32
            }
        );
    }

    #[test]
    fn equal_lengths_never_split() {
        let config = TableConfig::dup_sort().with_conversion(8, 8);
        let key = bytes(1, 8);
        let (physical_key, physical_value) = encode(&config, &key, b"v").unwrap();
        assert_eq!(physical_key, key.as_slice());
        assert_eq!(physical_value.as_ref(), b"v");

        let (logical_key, logical_value) = decode(&config, &key, b"v").unwrap();
        assert_eq!(logical_key.as_ref(), key.as_slice());
        assert_eq!(logical_value, b"v");
    }
}
