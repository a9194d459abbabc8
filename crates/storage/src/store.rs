use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

use chainkv_types::ShortKey;
use tracing::{debug, info};

use crate::api::{
    CatalogConfig, ChaindataTable, ConfigError, DupSortError, Error, StorageBackend,
    StorageReadView, TableConfig, dupsort,
    keys::{DB_SCHEMA_VERSION_KEY, SchemaVersion},
};
use crate::backend::InMemoryBackend;
use crate::check::{self, Violation};
use crate::layout::{
    HistoryLayout, TrieLayout,
    history::{ShardSuffix, shard_key, split_shard_key},
};
use crate::metrics;

/// Logical key-value pairs of a table.
pub type Entries = Vec<(Vec<u8>, Vec<u8>)>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("table {table}: {source}")]
    DupSort {
        table: String,
        #[source]
        source: DupSortError,
    },
    #[error("table {table} is deprecated")]
    TableDeprecated { table: String },
    #[error("stored schema version has {len} bytes, expected {expected}")]
    InvalidSchemaVersion { len: usize, expected: usize },
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        StoreError::Backend(err)
    }
}

/// A write resolved to its physical form.
enum PhysicalWrite<'a> {
    /// One value of an emulated DupSort key: `(prefix, suffix ++ value)`.
    Split {
        prefix: &'a [u8],
        suffix_len: usize,
        value: Cow<'a, [u8]>,
    },
    /// The logical key is the physical key and holds a single value.
    Replace { key: &'a [u8], value: &'a [u8] },
    /// A native DupSort or plain table; the engine decides what a put does.
    Direct { key: &'a [u8], value: &'a [u8] },
}

/// Logical view over a storage backend.
///
/// Tables are looked up in the catalog the store was opened with and every
/// read and write goes through the table's DupSort conversion, so callers
/// always see logical keys. Deprecated tables can't be accessed.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    catalog: Arc<CatalogConfig>,
}

impl Store {
    pub fn new(backend: Arc<dyn StorageBackend>, catalog: CatalogConfig) -> Self {
        Self {
            backend,
            catalog: Arc::new(catalog),
        }
    }

    /// A store over a fresh in-memory backend with every active table of
    /// `catalog`.
    pub fn in_memory(catalog: &CatalogConfig) -> Self {
        Self::new(Arc::new(InMemoryBackend::open(catalog)), catalog.clone())
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    fn config(&self, table: &str) -> Result<&TableConfig, StoreError> {
        let config = self.catalog.lookup(table)?;
        if config.is_deprecated {
            return Err(StoreError::TableDeprecated {
                table: table.to_owned(),
            });
        }
        Ok(config)
    }

    fn resolve<'a>(
        table: &str,
        config: &TableConfig,
        key: &'a [u8],
        value: &'a [u8],
    ) -> Result<PhysicalWrite<'a>, StoreError> {
        let Some(conversion) = config.dup_sort_conversion else {
            return Ok(PhysicalWrite::Direct { key, value });
        };
        let (physical_key, physical_value) = conversion.encode(key, value).map_err(|source| {
            debug!(table, key = %ShortKey(key), %source, "Rejected by DupSort conversion");
            metrics::inc_dupsort_rejections(table);
            StoreError::DupSort {
                table: table.to_owned(),
                source,
            }
        })?;
        if physical_key.len() == key.len() {
            Ok(PhysicalWrite::Replace { key, value })
        } else {
            Ok(PhysicalWrite::Split {
                prefix: physical_key,
                suffix_len: conversion.suffix_len(),
                value: physical_value,
            })
        }
    }

    /// The stored physical value of the split key `prefix ++ suffix`.
    fn find_dup(
        view: &dyn StorageReadView,
        table: &str,
        prefix: &[u8],
        suffix: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        Ok(view
            .seek_both_range(table, prefix, suffix)?
            .filter(|stored| stored.starts_with(suffix)))
    }

    // ============ Logical Access ============

    /// Writes a single pair. See [`Store::put_batch`].
    pub fn put(&self, table: impl AsRef<str>, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.put_batch(table, [(key.to_vec(), value.to_vec())])
    }

    /// Writes pairs atomically.
    ///
    /// Tables with a DupSort conversion behave as maps: a put replaces the
    /// previous value of the same logical key. Other DupSort tables keep every
    /// distinct value of a key. If a key appears more than once in `entries`,
    /// the last pair wins.
    pub fn put_batch(
        &self,
        table: impl AsRef<str>,
        entries: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> Result<(), StoreError> {
        let table = table.as_ref();
        let config = self.config(table)?;
        let entries: BTreeMap<Vec<u8>, Vec<u8>> = entries.into_iter().collect();

        let view = self.backend.begin_read()?;
        let mut batch = self.backend.begin_write()?;
        for (key, value) in &entries {
            match Self::resolve(table, config, key, value)? {
                PhysicalWrite::Split {
                    prefix,
                    suffix_len,
                    value,
                } => {
                    let suffix = &value[..suffix_len];
                    if let Some(stored) = Self::find_dup(&*view, table, prefix, suffix)? {
                        batch.delete_dup(table, prefix.to_vec(), stored)?;
                    }
                    batch.put_batch(table, vec![(prefix.to_vec(), value.into_owned())])?;
                }
                PhysicalWrite::Replace { key, value } => {
                    batch.delete_batch(table, vec![key.to_vec()])?;
                    batch.put_batch(table, vec![(key.to_vec(), value.to_vec())])?;
                }
                PhysicalWrite::Direct { key, value } => {
                    batch.put_batch(table, vec![(key.to_vec(), value.to_vec())])?;
                }
            }
        }
        drop(view);
        batch.commit()?;

        debug!(table, entries = entries.len(), "Wrote entries");
        Ok(())
    }

    /// The value of a logical key. For DupSort tables without a conversion,
    /// the smallest value.
    pub fn get(&self, table: impl AsRef<str>, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let table = table.as_ref();
        let config = self.config(table)?;
        let view = self.backend.begin_read()?;

        match Self::resolve(table, config, key, &[])? {
            PhysicalWrite::Split {
                prefix,
                suffix_len,
                value,
            } => {
                let suffix = &value[..suffix_len];
                Ok(Self::find_dup(&*view, table, prefix, suffix)?
                    .map(|mut stored| stored.split_off(suffix_len)))
            }
            PhysicalWrite::Replace { key, .. } | PhysicalWrite::Direct { key, .. } => {
                Ok(view.get(table, key)?)
            }
        }
    }

    /// Removes a logical key with all its values.
    pub fn delete(&self, table: impl AsRef<str>, key: &[u8]) -> Result<(), StoreError> {
        let table = table.as_ref();
        let config = self.config(table)?;
        let view = self.backend.begin_read()?;
        let mut batch = self.backend.begin_write()?;

        match Self::resolve(table, config, key, &[])? {
            PhysicalWrite::Split {
                prefix,
                suffix_len,
                value,
            } => {
                let suffix = &value[..suffix_len];
                if let Some(stored) = Self::find_dup(&*view, table, prefix, suffix)? {
                    batch.delete_dup(table, prefix.to_vec(), stored)?;
                }
            }
            PhysicalWrite::Replace { key, .. } | PhysicalWrite::Direct { key, .. } => {
                batch.delete_batch(table, vec![key.to_vec()])?;
            }
        }
        drop(view);
        batch.commit()?;
        Ok(())
    }

    /// Logical pairs whose key starts with `prefix`, in logical key order.
    pub fn iter(&self, table: impl AsRef<str>, prefix: &[u8]) -> Result<Entries, StoreError> {
        let table = table.as_ref();
        let config = self.config(table)?;
        // Split keys only keep `to_len` bytes in the engine
        let physical_prefix = match config.dup_sort_conversion {
            Some(conversion) if prefix.len() > conversion.to_len => &prefix[..conversion.to_len],
            _ => prefix,
        };

        let view = self.backend.begin_read()?;
        let mut entries = Vec::new();
        for res in view.prefix_iterator(table, physical_prefix)? {
            let (physical_key, physical_value) = res?;
            let (key, value) =
                dupsort::decode(config, &physical_key, &physical_value).map_err(|source| {
                    StoreError::DupSort {
                        table: table.to_owned(),
                        source,
                    }
                })?;
            if key.starts_with(prefix) {
                entries.push((key.into_owned(), value.to_vec()));
            }
        }
        Ok(entries)
    }

    // ============ History Indices ============

    /// The shard of `entity` that covers `number`, with its suffix.
    pub fn seek_history(
        &self,
        layout: &HistoryLayout,
        entity: &[u8],
        number: u64,
    ) -> Result<Option<(ShardSuffix, Vec<u8>)>, StoreError> {
        self.config(layout.table)?;
        let view = self.backend.begin_read()?;
        let target = shard_key(entity, ShardSuffix::UpTo(number));

        let Some((key, value)) = view.seek(layout.table, &target)? else {
            return Ok(None);
        };
        Ok(split_shard_key(&key, layout.entity_len)
            .filter(|(found, _)| *found == entity)
            .map(|(_, suffix)| (suffix, value)))
    }

    /// The open shard of `entity`.
    pub fn last_shard(
        &self,
        layout: &HistoryLayout,
        entity: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.get(layout.table, &shard_key(entity, ShardSuffix::Last))
    }

    // ============ Schema ============

    pub fn write_schema_version(&self, version: SchemaVersion) -> Result<(), StoreError> {
        self.put(
            ChaindataTable::DatabaseInfo,
            DB_SCHEMA_VERSION_KEY,
            &version.to_bytes(),
        )?;
        info!(%version, "Wrote schema version");
        Ok(())
    }

    pub fn schema_version(&self) -> Result<Option<SchemaVersion>, StoreError> {
        let Some(bytes) = self.get(ChaindataTable::DatabaseInfo, DB_SCHEMA_VERSION_KEY)? else {
            return Ok(None);
        };
        SchemaVersion::from_bytes(&bytes)
            .map(Some)
            .ok_or(StoreError::InvalidSchemaVersion {
                len: bytes.len(),
                expected: SchemaVersion::ENCODED_LENGTH,
            })
    }

    /// Drops every deprecated table of the catalog that still exists in the
    /// backend. Returns the dropped names.
    pub fn drop_deprecated_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut dropped = Vec::new();
        for (name, _) in self.catalog.deprecated() {
            if self.backend.drop_table(name)? {
                info!(table = name, "Dropped deprecated table");
                dropped.push(name.to_owned());
            }
        }
        Ok(dropped)
    }

    // ============ Consistency ============

    pub fn check_history(&self, layout: &HistoryLayout) -> Result<Vec<Violation>, StoreError> {
        let entries = self.iter(layout.table, &[])?;
        Ok(check::check_history(layout, &entries))
    }

    pub fn check_trie(&self, layout: &TrieLayout) -> Result<Vec<Violation>, StoreError> {
        let entries = self.iter(layout.table, &[])?;
        Ok(check::check_trie(layout, &entries))
    }
}
