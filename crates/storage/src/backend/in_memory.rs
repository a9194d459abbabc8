use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::api::{
    CatalogConfig, Error, PrefixResult, StorageBackend, StorageReadView, StorageWriteBatch,
    TableFlags,
};

/// Contents of one table, ordered by key.
#[derive(Debug)]
enum TableData {
    Plain(BTreeMap<Vec<u8>, Vec<u8>>),
    DupSort(BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>),
}

impl TableData {
    fn new(flags: TableFlags) -> Self {
        if flags.is_dup_sort() {
            TableData::DupSort(BTreeMap::new())
        } else {
            TableData::Plain(BTreeMap::new())
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        match self {
            TableData::Plain(data) => {
                data.insert(key, value);
            }
            TableData::DupSort(data) => {
                data.entry(key).or_default().insert(value);
            }
        }
    }

    fn delete(&mut self, key: &[u8]) {
        match self {
            TableData::Plain(data) => {
                data.remove(key);
            }
            TableData::DupSort(data) => {
                data.remove(key);
            }
        }
    }

    fn delete_dup(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let TableData::DupSort(data) = self else {
            return Err("delete_dup on a table without DupSort".into());
        };
        if let Some(values) = data.get_mut(key) {
            values.remove(value);
            if values.is_empty() {
                data.remove(key);
            }
        }
        Ok(())
    }

    fn first_at_or_after(&self, key: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        let bound = (Bound::Included(key), Bound::Unbounded);
        match self {
            TableData::Plain(data) => data
                .range::<[u8], _>(bound)
                .next()
                .map(|(k, v)| (k.clone(), v.clone())),
            TableData::DupSort(data) => data
                .range::<[u8], _>(bound)
                .find_map(|(k, values)| values.first().map(|v| (k.clone(), v.clone()))),
        }
    }
}

type StorageData = HashMap<String, TableData>;

/// In-memory storage backend using ordered maps.
///
/// Honors the `DUP_SORT` flag of each table; the other flags are accepted and
/// ignored, keys and values are always compared byte-wise.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    data: Arc<RwLock<StorageData>>,
}

impl InMemoryBackend {
    /// Create a new backend without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with one table per active, non-deprecated table of
    /// `catalog`.
    pub fn open(catalog: &CatalogConfig) -> Self {
        let backend = Self::new();
        let mut created = 0;
        for (name, config) in catalog.iter() {
            if config.is_deprecated {
                continue;
            }
            backend.create_table(name, config.flags);
            created += 1;
        }
        info!(catalog = %catalog.catalog(), tables = created, "Opened in-memory database");
        backend
    }

    /// Create an empty table if it doesn't exist yet.
    pub fn create_table(&self, name: &str, flags: TableFlags) {
        let mut guard = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entry(name.to_owned()).or_insert_with(|| {
            debug!(table = name, %flags, "Created table");
            TableData::new(flags)
        });
    }
}

fn table_not_found(table: &str) -> Error {
    format!("Table {table} not found").into()
}

impl StorageBackend for InMemoryBackend {
    fn begin_read(&self) -> Result<Box<dyn StorageReadView + '_>, Error> {
        let guard = self.data.read().map_err(|e| e.to_string())?;
        Ok(Box::new(InMemoryReadView { guard }))
    }

    fn begin_write(&self) -> Result<Box<dyn StorageWriteBatch + 'static>, Error> {
        Ok(Box::new(InMemoryWriteBatch {
            data: Arc::clone(&self.data),
            ops: Vec::new(),
        }))
    }

    fn tables(&self) -> Result<Vec<String>, Error> {
        let guard = self.data.read().map_err(|e| e.to_string())?;
        let mut names: Vec<_> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn drop_table(&self, table: &str) -> Result<bool, Error> {
        let mut guard = self.data.write().map_err(|e| e.to_string())?;
        Ok(guard.remove(table).is_some())
    }
}

/// Read view holding a read lock on the storage data.
struct InMemoryReadView<'a> {
    guard: std::sync::RwLockReadGuard<'a, StorageData>,
}

impl InMemoryReadView<'_> {
    fn table(&self, table: &str) -> Result<&TableData, Error> {
        self.guard.get(table).ok_or_else(|| table_not_found(table))
    }
}

impl StorageReadView for InMemoryReadView<'_> {
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(match self.table(table)? {
            TableData::Plain(data) => data.get(key).cloned(),
            TableData::DupSort(data) => data.get(key).and_then(|values| values.first()).cloned(),
        })
    }

    fn seek(&self, table: &str, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, Error> {
        Ok(self.table(table)?.first_at_or_after(key))
    }

    fn seek_both_range(
        &self,
        table: &str,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        let TableData::DupSort(data) = self.table(table)? else {
            return Err(format!("Table {table} is not DupSort").into());
        };
        Ok(data.get(key).and_then(|values| {
            values
                .range::<[u8], _>((Bound::Included(value), Bound::Unbounded))
                .next()
                .cloned()
        }))
    }

    fn prefix_iterator(
        &self,
        table: &str,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = PrefixResult> + '_>, Error> {
        let prefix_owned = prefix.to_vec();
        let bound = (Bound::Included(prefix), Bound::Unbounded);

        let iter: Box<dyn Iterator<Item = PrefixResult> + '_> = match self.table(table)? {
            TableData::Plain(data) => Box::new(
                data.range::<[u8], _>(bound)
                    .take_while(move |(k, _)| k.starts_with(&prefix_owned))
                    .map(|(k, v)| Ok((k.clone().into_boxed_slice(), v.clone().into_boxed_slice()))),
            ),
            TableData::DupSort(data) => Box::new(
                data.range::<[u8], _>(bound)
                    .take_while(move |(k, _)| k.starts_with(&prefix_owned))
                    .flat_map(|(k, values)| {
                        values.iter().map(move |v| {
                            Ok::<_, Error>((k.clone().into_boxed_slice(), v.clone().into_boxed_slice()))
                        })
                    }),
            ),
        };

        Ok(iter)
    }
}

enum WriteOp {
    Put(String, Vec<u8>, Vec<u8>),
    Delete(String, Vec<u8>),
    DeleteDup(String, Vec<u8>, Vec<u8>),
}

impl WriteOp {
    fn table(&self) -> &str {
        match self {
            WriteOp::Put(table, ..) | WriteOp::Delete(table, _) | WriteOp::DeleteDup(table, ..) => {
                table
            }
        }
    }
}

/// Write batch that accumulates changes before committing.
struct InMemoryWriteBatch {
    data: Arc<RwLock<StorageData>>,
    ops: Vec<WriteOp>,
}

impl StorageWriteBatch for InMemoryWriteBatch {
    fn put_batch(&mut self, table: &str, batch: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Error> {
        self.ops.extend(
            batch
                .into_iter()
                .map(|(key, value)| WriteOp::Put(table.to_owned(), key, value)),
        );
        Ok(())
    }

    fn delete_batch(&mut self, table: &str, keys: Vec<Vec<u8>>) -> Result<(), Error> {
        self.ops.extend(
            keys.into_iter()
                .map(|key| WriteOp::Delete(table.to_owned(), key)),
        );
        Ok(())
    }

    fn delete_dup(&mut self, table: &str, key: Vec<u8>, value: Vec<u8>) -> Result<(), Error> {
        self.ops.push(WriteOp::DeleteDup(table.to_owned(), key, value));
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        let mut guard = self.data.write().map_err(|e| e.to_string())?;

        // Validate everything first so a failing batch leaves no partial writes
        for op in &self.ops {
            match (op, guard.get(op.table())) {
                (_, None) => return Err(table_not_found(op.table())),
                (WriteOp::DeleteDup(table, ..), Some(TableData::Plain(_))) => {
                    return Err(format!("Table {table} is not DupSort").into());
                }
                _ => {}
            }
        }

        for op in self.ops {
            let Some(table_data) = guard.get_mut(op.table()) else {
                continue;
            };
            match op {
                WriteOp::Put(_, key, value) => table_data.put(key, value),
                WriteOp::Delete(_, key) => table_data.delete(&key),
                WriteOp::DeleteDup(_, key, value) => table_data.delete_dup(&key, &value)?,
            }
        }

        Ok(())
    }
}
