pub mod api;
pub mod backend;
pub mod check;
pub mod layout;
mod metrics;
mod store;

pub use api::{Catalog, Registry, StorageBackend, TableConfig, TableFlags};
pub use check::Violation;
pub use store::{Entries, Store, StoreError};
