//! Schema and storage backend API.
//!
//! # Schema
//!
//! - [`Catalog`] and the per-catalog table enums ([`ChaindataTable`], ...): the
//!   closed set of tables each subsystem uses.
//! - [`TableFlags`], [`TableConfig`]: physical properties of a table.
//! - [`RegistryBuilder`], [`Registry`]: finalized, immutable configuration of
//!   every catalog.
//! - [`dupsort`]: the reversible key conversion for DupSort tables with wide keys.
//!
//! # Traits
//!
//! - [`StorageBackend`]: Main trait for storage implementations. Creates read views and write batches.
//! - [`StorageReadView`]: Read-only access to storage via `get`, `seek` and `prefix_iterator`.
//! - [`StorageWriteBatch`]: Batched writes with atomic `commit`.

mod config;
pub mod dupsort;
mod flags;
pub mod keys;
mod tables;
mod traits;

pub use config::{
    CatalogConfig, ConfigError, DupSortConversion, Registry, RegistryBuilder, TableConfig,
};
pub use dupsort::DupSortError;
pub use flags::TableFlags;
pub use tables::{
    Catalog, ChaindataTable, DownloaderTable, ReconTable, SentryTable, TableId, TxPoolTable,
    deprecated, table_names,
};
pub use traits::{Error, PrefixResult, StorageBackend, StorageReadView, StorageWriteBatch};
