//! Consistency checks for tables with a layout contract.
//!
//! The checks take a table's entries in any order and report every violation
//! they find instead of stopping at the first one.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::layout::{
    HistoryLayout, TrieKind, TrieLayout, TrieNode, TrieNodeError,
    history::{SHARD_SIZE_LIMIT, ShardSuffix, split_shard_key},
};
use crate::metrics;

/// A single layout violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("key {} is malformed: {reason}", hex::encode(.key))]
    MalformedKey { key: Vec<u8>, reason: &'static str },
    #[error("entity {} has no last shard", hex::encode(.entity))]
    MissingLastShard { entity: Vec<u8> },
    #[error("entity {} has {count} last shards", hex::encode(.entity))]
    DuplicateLastShard { entity: Vec<u8>, count: usize },
    #[error("shard {} is empty", hex::encode(.key))]
    EmptyShard { key: Vec<u8> },
    #[error("shard {} has {len} bytes, limit is {limit}", hex::encode(.key))]
    OversizedShard { key: Vec<u8>, len: usize, limit: usize },
    #[error("trie node {} can't be decoded: {error}", hex::encode(.key))]
    UndecodableNode { key: Vec<u8>, error: TrieNodeError },
    #[error("trie node {} has empty has_state", hex::encode(.key))]
    EmptyState { key: Vec<u8> },
    #[error("trie node {}: has_tree {has_tree:#06x} not in has_state {has_state:#06x}", hex::encode(.key))]
    TreeNotInState {
        key: Vec<u8>,
        has_state: u16,
        has_tree: u16,
    },
    #[error("trie node {}: has_hash {has_hash:#06x} not in has_state {has_state:#06x}", hex::encode(.key))]
    HashNotInState {
        key: Vec<u8>,
        has_state: u16,
        has_hash: u16,
    },
    #[error("trie node {} below the first level has neither has_tree nor has_hash", hex::encode(.key))]
    EmptyBranch { key: Vec<u8> },
    #[error("trie node {} has {found} hashes, has_hash expects {expected}", hex::encode(.key))]
    HashCountMismatch {
        key: Vec<u8>,
        expected: usize,
        found: usize,
    },
    #[error("storage trie root {} has no root hash", hex::encode(.key))]
    MissingRootHash { key: Vec<u8> },
    #[error("trie node {} has a root hash but is not a storage trie root", hex::encode(.key))]
    UnexpectedRootHash { key: Vec<u8> },
    #[error("trie node {} has no ancestor record", hex::encode(.key))]
    MissingParent { key: Vec<u8> },
    #[error("trie node {} is missing from has_tree of its ancestor {}", hex::encode(.key), hex::encode(.parent))]
    ParentTreeBitUnset { key: Vec<u8>, parent: Vec<u8> },
}

impl Violation {
    /// Stable identifier of the violation, independent of the data.
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::MalformedKey { .. } => "malformed_key",
            Violation::MissingLastShard { .. } => "missing_last_shard",
            Violation::DuplicateLastShard { .. } => "duplicate_last_shard",
            Violation::EmptyShard { .. } => "empty_shard",
            Violation::OversizedShard { .. } => "oversized_shard",
            Violation::UndecodableNode { .. } => "undecodable_node",
            Violation::EmptyState { .. } => "empty_state",
            Violation::TreeNotInState { .. } => "tree_not_in_state",
            Violation::HashNotInState { .. } => "hash_not_in_state",
            Violation::EmptyBranch { .. } => "empty_branch",
            Violation::HashCountMismatch { .. } => "hash_count_mismatch",
            Violation::MissingRootHash { .. } => "missing_root_hash",
            Violation::UnexpectedRootHash { .. } => "unexpected_root_hash",
            Violation::MissingParent { .. } => "missing_parent",
            Violation::ParentTreeBitUnset { .. } => "parent_tree_bit_unset",
        }
    }
}

/// Checks the shard layout of a history index.
///
/// Every entity needs exactly one last shard, and every shard must hold a
/// non-empty bitmap within [`SHARD_SIZE_LIMIT`].
pub fn check_history(layout: &HistoryLayout, entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<Violation> {
    let _timing = metrics::time_consistency_check(layout.table);
    let mut violations = Vec::new();
    // Entity -> number of last shards, ordered so reports are deterministic
    let mut last_shards: BTreeMap<&[u8], usize> = BTreeMap::new();

    for (key, value) in entries {
        let Some((entity, suffix)) = split_shard_key(key, layout.entity_len) else {
            violations.push(Violation::MalformedKey {
                key: key.clone(),
                reason: "length is not entity plus shard suffix",
            });
            continue;
        };

        let count = last_shards.entry(entity).or_default();
        if suffix == ShardSuffix::Last {
            *count += 1;
        }

        if value.is_empty() {
            violations.push(Violation::EmptyShard { key: key.clone() });
        } else if value.len() > SHARD_SIZE_LIMIT {
            violations.push(Violation::OversizedShard {
                key: key.clone(),
                len: value.len(),
                limit: SHARD_SIZE_LIMIT,
            });
        }
    }

    for (entity, count) in last_shards {
        match count {
            1 => {}
            0 => violations.push(Violation::MissingLastShard {
                entity: entity.to_vec(),
            }),
            count => violations.push(Violation::DuplicateLastShard {
                entity: entity.to_vec(),
                count,
            }),
        }
    }

    report(layout.table, entries.len(), &violations);
    violations
}

/// Checks the branch records of an intermediate trie table.
pub fn check_trie(layout: &TrieLayout, entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<Violation> {
    let _timing = metrics::time_consistency_check(layout.table);
    let kind = layout.kind;
    let prefix_len = kind.prefix_len();
    let mut violations = Vec::new();
    let mut nodes: HashMap<&[u8], TrieNode> = HashMap::with_capacity(entries.len());

    for (key, value) in entries {
        if key.len() < prefix_len + kind.min_path_len() {
            violations.push(Violation::MalformedKey {
                key: key.clone(),
                reason: "shorter than the shortest trie path",
            });
            continue;
        }
        if key[prefix_len..].iter().any(|nibble| *nibble > 0x0f) {
            violations.push(Violation::MalformedKey {
                key: key.clone(),
                reason: "path byte is not a nibble",
            });
            continue;
        }
        match TrieNode::decode(value) {
            Ok(node) => {
                nodes.insert(key, node);
            }
            Err(error) => violations.push(Violation::UndecodableNode {
                key: key.clone(),
                error,
            }),
        }
    }

    // Sorted so that reports don't depend on hashing
    let mut keys: Vec<&[u8]> = nodes.keys().copied().collect();
    keys.sort_unstable();

    for key in keys {
        let node = &nodes[key];
        let path_len = key.len() - prefix_len;
        check_node(key, node, path_len, kind, &mut violations);

        if path_len <= kind.min_path_len() {
            continue;
        }
        // Closest stored ancestor; extension nodes leave gaps in the path
        let ancestor = (kind.min_path_len()..path_len)
            .rev()
            .find_map(|len| nodes.get(&key[..prefix_len + len]).map(|parent| (len, parent)));
        match ancestor {
            Some((len, parent)) => {
                let nibble = key[prefix_len + len];
                if parent.has_tree & (1 << nibble) == 0 {
                    violations.push(Violation::ParentTreeBitUnset {
                        key: key.to_vec(),
                        parent: key[..prefix_len + len].to_vec(),
                    });
                }
            }
            // Records below the top level need some stored ancestor
            None => violations.push(Violation::MissingParent { key: key.to_vec() }),
        }
    }

    report(layout.table, entries.len(), &violations);
    violations
}

fn check_node(
    key: &[u8],
    node: &TrieNode,
    path_len: usize,
    kind: TrieKind,
    violations: &mut Vec<Violation>,
) {
    if node.has_state == 0 {
        violations.push(Violation::EmptyState { key: key.to_vec() });
    }
    if node.has_tree & !node.has_state != 0 {
        violations.push(Violation::TreeNotInState {
            key: key.to_vec(),
            has_state: node.has_state,
            has_tree: node.has_tree,
        });
    }
    if node.has_hash & !node.has_state != 0 {
        violations.push(Violation::HashNotInState {
            key: key.to_vec(),
            has_state: node.has_state,
            has_hash: node.has_hash,
        });
    }
    // Only first-level account records may point at leaves alone
    let may_be_empty = kind == TrieKind::Accounts && path_len == 1;
    if !may_be_empty && node.has_tree == 0 && node.has_hash == 0 {
        violations.push(Violation::EmptyBranch { key: key.to_vec() });
    }

    let expected = node.has_hash.count_ones() as usize;
    if node.hashes.len() != expected {
        violations.push(Violation::HashCountMismatch {
            key: key.to_vec(),
            expected,
            found: node.hashes.len(),
        });
    }

    let is_storage_root = kind == TrieKind::Storage && path_len == 0;
    match (is_storage_root, node.root_hash.is_some()) {
        (true, false) => violations.push(Violation::MissingRootHash { key: key.to_vec() }),
        (false, true) => violations.push(Violation::UnexpectedRootHash { key: key.to_vec() }),
        _ => {}
    }
}

fn report(table: &str, entries: usize, violations: &[Violation]) {
    if violations.is_empty() {
        debug!(table, entries, "Consistency check passed");
        return;
    }
    metrics::inc_consistency_violations(table, violations.len());
    warn!(
        table,
        entries,
        violations = violations.len(),
        first = %violations[0],
        "Consistency check found violations"
    );
}
