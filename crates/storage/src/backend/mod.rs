//! Storage backend implementations.
//!
//! This module provides concrete implementations of the [`crate::api::StorageBackend`] trait.
//!
//! # Backends
//!
//! - [`InMemoryBackend`]: Thread-safe in-memory storage using `RwLock<HashMap>` of
//!   ordered maps, with native DupSort tables. Suitable for testing, tooling and
//!   consistency checks over sample data. Data is lost on restart.

mod in_memory;
#[cfg(test)]
pub(crate) mod tests;

pub use in_memory::InMemoryBackend;
