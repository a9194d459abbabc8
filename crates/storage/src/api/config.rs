//! Per-table configuration and the registry that finalizes it.
//!
//! A [`RegistryBuilder`] collects table lists, explicit configurations and
//! deprecations for each catalog. Finalizing a catalog sorts its names into
//! byte order, fills default entries and assigns ordinals. The resulting
//! [`Registry`] is immutable and can be shared freely between threads.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::LazyLock,
};

use tracing::{debug, info};

use super::{
    Catalog, ChaindataTable, DownloaderTable, ReconTable, SentryTable, TableFlags, TableId,
    TxPoolTable,
};
use crate::metrics;

/// Configuration faults. All of them indicate a mismatch between code and
/// schema and should abort initialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("empty table name in catalog {catalog}")]
    EmptyName { catalog: Catalog },
    #[error("table {name} registered twice in catalog {catalog}")]
    DuplicateName { catalog: Catalog, name: String },
    #[error("table {name} is not registered in catalog {catalog}")]
    NotFound { catalog: Catalog, name: String },
    #[error("table {name} has invalid DupSort conversion: from_len {from_len} < to_len {to_len}")]
    InvalidDupSortLengths {
        name: String,
        from_len: usize,
        to_len: usize,
    },
    #[error("table {name} has a DupSort conversion but no DUP_SORT flag")]
    ConversionWithoutDupSort { name: String },
    #[error("catalog {catalog} is finalized, its table list can't change")]
    Frozen { catalog: Catalog },
    #[error("unknown catalog {name}")]
    UnknownCatalog { name: String },
}

/// Parameters of the automatic DupSort key conversion.
///
/// A logical key of exactly `from_len` bytes is stored with its first `to_len`
/// bytes as the physical key and the remaining bytes prepended to the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DupSortConversion {
    pub from_len: usize,
    pub to_len: usize,
}

impl DupSortConversion {
    pub const fn new(from_len: usize, to_len: usize) -> Self {
        Self { from_len, to_len }
    }

    /// Width of the key suffix moved into the value.
    pub const fn suffix_len(&self) -> usize {
        self.from_len - self.to_len
    }
}

/// Configuration of a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableConfig {
    pub flags: TableFlags,
    /// Enables the key transformation of [`crate::api::dupsort`].
    ///
    /// Lets the physical layout change without touching the code that reads
    /// and writes the table.
    pub dup_sort_conversion: Option<DupSortConversion>,
    pub is_deprecated: bool,
    /// Position of the table in its catalog's sorted name list.
    ///
    /// `None` for names that only appear in the deprecated list.
    pub ordinal: Option<usize>,
}

impl TableConfig {
    pub const fn new(flags: TableFlags) -> Self {
        Self {
            flags,
            dup_sort_conversion: None,
            is_deprecated: false,
            ordinal: None,
        }
    }

    pub const fn dup_sort() -> Self {
        Self::new(TableFlags::DUP_SORT)
    }

    pub const fn with_conversion(mut self, from_len: usize, to_len: usize) -> Self {
        self.dup_sort_conversion = Some(DupSortConversion::new(from_len, to_len));
        self
    }

    pub const fn auto_dup_sort_conversion(&self) -> bool {
        self.dup_sort_conversion.is_some()
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self.dup_sort_conversion {
            Some(DupSortConversion { from_len, to_len }) if from_len < to_len => {
                Err(ConfigError::InvalidDupSortLengths {
                    name: name.to_owned(),
                    from_len,
                    to_len,
                })
            }
            Some(_) if !self.flags.is_dup_sort() => Err(ConfigError::ConversionWithoutDupSort {
                name: name.to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

/// A catalog's state while it is being assembled.
#[derive(Debug, Default)]
struct CatalogDraft {
    names: Vec<String>,
    configs: HashMap<String, TableConfig>,
    deprecated: Vec<String>,
    finalized: bool,
}

impl CatalogDraft {
    fn ensure_mutable(&self, catalog: Catalog) -> Result<(), ConfigError> {
        if self.finalized {
            return Err(ConfigError::Frozen { catalog });
        }
        Ok(())
    }

    /// Sorts, fills defaults, propagates deprecation and assigns ordinals.
    ///
    /// Running it again on the same draft changes nothing.
    fn finalize(&mut self, catalog: Catalog) -> Result<(), ConfigError> {
        // Stable, so repeated runs never reorder anything.
        self.names.sort();

        for name in &self.names {
            self.configs.entry(name.clone()).or_default();
        }

        for name in &self.deprecated {
            self.configs.entry(name.clone()).or_default().is_deprecated = true;
        }

        for (ordinal, name) in self.names.iter().enumerate() {
            if let Some(config) = self.configs.get_mut(name) {
                config.ordinal = Some(ordinal);
            }
        }

        // Configured names must have been declared somewhere.
        let declared: HashSet<&String> = self.names.iter().chain(&self.deprecated).collect();
        if let Some(stray) = self.configs.keys().find(|name| !declared.contains(name)) {
            return Err(ConfigError::NotFound {
                catalog,
                name: stray.clone(),
            });
        }

        if !self.finalized {
            debug!(%catalog, tables = self.names.len(), deprecated = self.deprecated.len(), "Finalized table catalog");
        }
        self.finalized = true;
        Ok(())
    }
}

/// Collects table declarations and builds an immutable [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    drafts: BTreeMap<Catalog, CatalogDraft>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with every built-in catalog, its explicit
    /// configuration and its deprecated tables.
    pub fn with_builtin_catalogs() -> Result<Self, ConfigError> {
        fn register_all<T: TableId>(builder: &mut RegistryBuilder) -> Result<(), ConfigError> {
            builder.register(T::CATALOG, T::TABLES.iter().map(|table| table.name()))?;
            builder.deprecate(T::CATALOG, T::CATALOG.deprecated_tables().iter().copied())?;
            Ok(())
        }

        let mut builder = Self::new();
        register_all::<ChaindataTable>(&mut builder)?;
        register_all::<TxPoolTable>(&mut builder)?;
        register_all::<SentryTable>(&mut builder)?;
        register_all::<DownloaderTable>(&mut builder)?;
        register_all::<ReconTable>(&mut builder)?;

        for (table, config) in chaindata_configs() {
            builder.configure(Catalog::Chaindata, table.name(), config)?;
        }
        Ok(builder)
    }

    /// Declares tables of `catalog`.
    ///
    /// Names must be non-empty and unique within the catalog.
    pub fn register<I, S>(&mut self, catalog: Catalog, names: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let draft = self.drafts.entry(catalog).or_default();
        draft.ensure_mutable(catalog)?;

        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen: HashSet<&str> = draft.names.iter().map(String::as_str).collect();
        for name in &names {
            if name.is_empty() {
                return Err(ConfigError::EmptyName { catalog });
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateName {
                    catalog,
                    name: name.clone(),
                });
            }
        }

        draft.names.extend(names);
        Ok(self)
    }

    /// Sets an explicit configuration. Ordinal and deprecation are managed by
    /// the registry and overwritten on finalize.
    pub fn configure(
        &mut self,
        catalog: Catalog,
        name: impl Into<String>,
        config: TableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        let draft = self.drafts.entry(catalog).or_default();
        draft.ensure_mutable(catalog)?;
        if name.is_empty() {
            return Err(ConfigError::EmptyName { catalog });
        }
        config.validate(&name)?;

        draft.configs.insert(
            name,
            TableConfig {
                is_deprecated: false,
                ordinal: None,
                ..config
            },
        );
        Ok(self)
    }

    /// Marks tables of `catalog` as deprecated. The names don't need to be
    /// registered.
    pub fn deprecate<I, S>(&mut self, catalog: Catalog, names: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let draft = self.drafts.entry(catalog).or_default();
        draft.ensure_mutable(catalog)?;
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(ConfigError::EmptyName { catalog });
            }
            if !draft.deprecated.contains(&name) {
                draft.deprecated.push(name);
            }
        }
        Ok(self)
    }

    /// Normalizes `catalog`. Idempotent; afterwards the catalog rejects
    /// further changes.
    pub fn finalize(&mut self, catalog: Catalog) -> Result<(), ConfigError> {
        self.drafts.entry(catalog).or_default().finalize(catalog)
    }

    /// Finalizes every catalog and freezes the result.
    pub fn build(mut self) -> Result<Registry, ConfigError> {
        let mut catalogs = Vec::with_capacity(Catalog::ALL.len());
        for catalog in Catalog::ALL {
            let mut draft = self.drafts.remove(&catalog).unwrap_or_default();
            draft.finalize(catalog)?;
            catalogs.push(CatalogConfig::from_draft(catalog, draft));
        }

        let catalogs: [CatalogConfig; 5] = catalogs
            .try_into()
            .unwrap_or_else(|_| unreachable!("one entry per catalog"));
        for catalog in &catalogs {
            metrics::set_catalog_tables(catalog.catalog().name(), catalog.len());
        }
        Ok(Registry { catalogs })
    }
}

/// Explicit configuration of chain-data tables. Every other table uses the
/// default configuration.
fn chaindata_configs() -> Vec<(ChaindataTable, TableConfig)> {
    use ChaindataTable::*;

    let mut configs = vec![
        (HashedStorage, TableConfig::dup_sort().with_conversion(72, 40)),
        (PlainState, TableConfig::dup_sort().with_conversion(60, 28)),
    ];
    configs.extend(
        [
            AccountChangeSet,
            StorageChangeSet,
            CallTraceSet,
            AccountKeys,
            AccountHistoryKeys,
            AccountIdx,
            StorageKeys,
            StorageHistoryKeys,
            StorageIdx,
            CodeKeys,
            CodeHistoryKeys,
            CodeIdx,
            LogAddressKeys,
            LogAddressIdx,
            LogTopicsKeys,
            LogTopicsIdx,
            TracesFromKeys,
            TracesFromIdx,
            TracesToKeys,
            TracesToIdx,
            RAccountKeys,
            RAccountIdx,
            RStorageKeys,
            RStorageIdx,
            RCodeKeys,
            RCodeIdx,
        ]
        .into_iter()
        .map(|table| (table, TableConfig::dup_sort())),
    );
    configs
}

/// The finalized configuration of one catalog.
///
/// Active tables are stored in an array indexed by ordinal, which is also the
/// canonical byte order of their names.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    catalog: Catalog,
    names: Vec<String>,
    configs: Vec<TableConfig>,
    ordinals: HashMap<String, usize>,
    /// Deprecated names that are not part of the active table list.
    retired: BTreeMap<String, TableConfig>,
}

impl CatalogConfig {
    fn from_draft(catalog: Catalog, mut draft: CatalogDraft) -> Self {
        let configs = draft
            .names
            .iter()
            .map(|name| draft.configs.remove(name).unwrap_or_default())
            .collect();
        let ordinals = draft
            .names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| (name.clone(), ordinal))
            .collect();

        Self {
            catalog,
            names: draft.names,
            configs,
            ordinals,
            retired: draft.configs.into_iter().collect(),
        }
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    /// Active table names in canonical order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of tables with an ordinal.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TableConfig> {
        match self.ordinals.get(name) {
            Some(&ordinal) => self.configs.get(ordinal),
            None => self.retired.get(name),
        }
    }

    /// Returns the configuration of `name`, or [`ConfigError::NotFound`] if the
    /// table was never declared in this catalog.
    pub fn lookup(&self, name: &str) -> Result<&TableConfig, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::NotFound {
            catalog: self.catalog,
            name: name.to_owned(),
        })
    }

    pub fn by_ordinal(&self, ordinal: usize) -> Option<(&str, &TableConfig)> {
        Some((self.names.get(ordinal)?.as_str(), self.configs.get(ordinal)?))
    }

    /// Active tables in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableConfig)> {
        self.names.iter().map(String::as_str).zip(&self.configs)
    }

    /// Every deprecated table, listed or not, sorted by name.
    pub fn deprecated(&self) -> impl Iterator<Item = (&str, &TableConfig)> {
        let mut deprecated: Vec<_> = self
            .iter()
            .chain(self.retired.iter().map(|(name, config)| (name.as_str(), config)))
            .filter(|(_, config)| config.is_deprecated)
            .collect();
        deprecated.sort_by_key(|(name, _)| *name);
        deprecated.into_iter()
    }
}

/// Finalized configuration of every catalog.
#[derive(Debug, Clone)]
pub struct Registry {
    catalogs: [CatalogConfig; 5],
}

impl Registry {
    /// The process-wide registry of built-in tables.
    ///
    /// Built on first access; concurrent first accesses block until the single
    /// initialization finishes.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: LazyLock<Registry> = LazyLock::new(|| {
            let registry = RegistryBuilder::with_builtin_catalogs()
                .and_then(RegistryBuilder::build)
                .expect("built-in table schema is consistent");
            info!(
                chaindata = registry.catalog(Catalog::Chaindata).len(),
                "Initialized table registry"
            );
            registry
        });
        &BUILTIN
    }

    pub fn catalog(&self, catalog: Catalog) -> &CatalogConfig {
        &self.catalogs[catalog.index()]
    }

    pub fn lookup(&self, catalog: Catalog, name: &str) -> Result<&TableConfig, ConfigError> {
        self.catalog(catalog).lookup(name)
    }

    /// Typed lookup; the catalog comes from the table's type.
    pub fn table<T: TableId>(&self, table: T) -> Result<&TableConfig, ConfigError> {
        self.lookup(T::CATALOG, table.name())
    }
}
