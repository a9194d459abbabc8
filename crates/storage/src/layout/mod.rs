//! Byte layouts that tables share with code outside this crate.
//!
//! Nothing here maintains the data. The layouts describe what a well-formed
//! table looks like so that [`crate::check`] can validate it.

pub mod history;
pub mod trie;

pub use history::{HISTORY_LAYOUTS, HistoryLayout, ShardSuffix};
pub use trie::{TrieKind, TrieLayout, TrieNode, TrieNodeError};
