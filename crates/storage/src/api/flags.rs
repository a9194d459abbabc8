use std::fmt;

bitflags::bitflags! {
    /// Physical properties of a table.
    ///
    /// The values match the storage engine's own database flags and are handed to
    /// it unchanged when tables are created; this layer never interprets them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TableFlags: u32 {
        /// Keys are compared from the last byte to the first.
        const REVERSE_KEY = 0x02;
        /// A key may hold several values, kept sorted.
        const DUP_SORT = 0x04;
        /// Keys are native-endian unsigned integers.
        const INTEGER_KEY = 0x08;
        /// Duplicate values are native-endian unsigned integers.
        const INTEGER_DUP = 0x20;
        /// Duplicate values are compared from the last byte to the first.
        const REVERSE_DUP = 0x40;
    }
}

impl TableFlags {
    /// No special ordering, one value per key.
    pub const DEFAULT: Self = Self::empty();

    pub const fn is_dup_sort(self) -> bool {
        self.contains(Self::DUP_SORT)
    }
}

impl fmt::Display for TableFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("DEFAULT");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}
