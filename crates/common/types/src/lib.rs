pub mod keys;
pub mod primitives;

/// Display helper for truncated keys (first 4 bytes as hex, then the length)
pub struct ShortKey<'a>(pub &'a [u8]);

impl std::fmt::Display for ShortKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter().take(4) {
            write!(f, "{:02x}", byte)?;
        }
        if self.0.len() > 4 {
            write!(f, "..[{}]", self.0.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ShortKey;

    #[test]
    fn short_key_truncates_long_keys() {
        assert_eq!(ShortKey(&[0xde, 0xad, 0xbe, 0xef, 0x01]).to_string(), "deadbeef..[5]");
        assert_eq!(ShortKey(&[0x0b]).to_string(), "0b");
        assert_eq!(ShortKey(&[]).to_string(), "");
    }
}
