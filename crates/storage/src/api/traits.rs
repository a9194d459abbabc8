/// Storage error type.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Result type for prefix iterator operations.
pub type PrefixResult = Result<(Box<[u8]>, Box<[u8]>), Error>;

/// A storage backend that can create read views and write batches.
///
/// Tables are addressed by name. A DupSort table keeps every distinct value
/// written under a key, sorted; any other table keeps the last value.
pub trait StorageBackend: Send + Sync {
    /// Begin a read-only transaction.
    fn begin_read(&self) -> Result<Box<dyn StorageReadView + '_>, Error>;

    /// Begin a write batch.
    fn begin_write(&self) -> Result<Box<dyn StorageWriteBatch + 'static>, Error>;

    /// Names of the tables that currently exist.
    fn tables(&self) -> Result<Vec<String>, Error>;

    /// Remove a table with all its contents. Returns whether it existed.
    fn drop_table(&self, table: &str) -> Result<bool, Error>;
}

/// A read-only view of the storage.
pub trait StorageReadView {
    /// Get the value of a key. For DupSort tables, the smallest value.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Get the first entry whose key is greater than or equal to `key`.
    fn seek(&self, table: &str, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, Error>;

    /// Get the smallest value of `key` that is greater than or equal to `value`.
    ///
    /// Only valid on DupSort tables.
    fn seek_both_range(
        &self,
        table: &str,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<Vec<u8>>, Error>;

    /// Iterate over all entries with a given key prefix, in key order.
    ///
    /// DupSort tables yield one entry per value.
    fn prefix_iterator(
        &self,
        table: &str,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = PrefixResult> + '_>, Error>;
}

/// A write batch that can be committed atomically.
///
/// Operations are applied in the order they were added.
pub trait StorageWriteBatch: Send {
    /// Put multiple key-value pairs into a table.
    fn put_batch(&mut self, table: &str, batch: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Error>;

    /// Delete multiple keys, with all their values, from a table.
    fn delete_batch(&mut self, table: &str, keys: Vec<Vec<u8>>) -> Result<(), Error>;

    /// Delete a single value of a DupSort key.
    fn delete_dup(&mut self, table: &str, key: Vec<u8>, value: Vec<u8>) -> Result<(), Error>;

    /// Commit the batch, consuming it.
    fn commit(self: Box<Self>) -> Result<(), Error>;
}
