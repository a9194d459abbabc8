//! Table catalogs.
//!
//! Every subsystem of the node owns a [`Catalog`] with its own closed set of
//! tables. The string name of a table is its identity inside the storage engine;
//! the enum variants exist so code can't misspell one.

use std::{fmt, str::FromStr};

use super::ConfigError;

/// A named group of tables belonging to one subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Catalog {
    Chaindata,
    TxPool,
    Sentry,
    Downloader,
    Recon,
}

impl Catalog {
    pub const ALL: [Catalog; 5] = [
        Catalog::Chaindata,
        Catalog::TxPool,
        Catalog::Sentry,
        Catalog::Downloader,
        Catalog::Recon,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Catalog::Chaindata => "chaindata",
            Catalog::TxPool => "txpool",
            Catalog::Sentry => "sentry",
            Catalog::Downloader => "downloader",
            Catalog::Recon => "recon",
        }
    }

    /// Position of the catalog in [`Catalog::ALL`].
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Names that may still exist in old databases but are no longer in use.
    ///
    /// They are kept in the configuration so a migration can find and drop them.
    pub const fn deprecated_tables(self) -> &'static [&'static str] {
        match self {
            Catalog::Chaindata => &[deprecated::CLIQUE, deprecated::TRANSITION_BLOCK],
            _ => &[],
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Catalog {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Catalog::ALL
            .into_iter()
            .find(|catalog| catalog.name() == s)
            .ok_or_else(|| ConfigError::UnknownCatalog { name: s.to_owned() })
    }
}

/// A table identifier belonging to a fixed catalog.
pub trait TableId: Copy + Eq + fmt::Debug + 'static {
    const CATALOG: Catalog;
    /// Every table of the catalog, in declaration order.
    const TABLES: &'static [Self];

    fn name(self) -> &'static str;
}

macro_rules! catalog_tables {
    (
        $(#[$enum_meta:meta])*
        pub enum $enum_name:ident in $catalog:path {
            $(
                $(#[$meta:meta])*
                $variant:ident => $name:literal,
            )*
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $enum_name {
            $(
                $(#[$meta])*
                $variant,
            )*
        }

        impl $enum_name {
            pub const ALL: &'static [$enum_name] = &[$($enum_name::$variant,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $($enum_name::$variant => $name,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|table| table.name() == name)
            }
        }

        impl TableId for $enum_name {
            const CATALOG: Catalog = $catalog;
            const TABLES: &'static [Self] = Self::ALL;

            fn name(self) -> &'static str {
                $enum_name::name(self)
            }
        }

        impl AsRef<str> for $enum_name {
            fn as_ref(&self) -> &str {
                self.name()
            }
        }

        impl fmt::Display for $enum_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

catalog_tables! {
    /// Tables of the main chain database.
    ///
    /// "Plain" state is keyed by unhashed addresses and used for block execution;
    /// "hashed" state is keyed by hashes and used for state root calculation. An
    /// incarnation is a big-endian `u64` counting how many times an account was
    /// self-destructed.
    pub enum ChaindataTable in Catalog::Chaindata {
        // ============ State ============

        /// Accounts: `address -> account`.
        /// Storage: `address ++ incarnation ++ location -> value`.
        ///
        /// Storage keys are 60 bytes wide. The table is DupSort and folds the
        /// location into the value, so the physical layout is
        /// `address ++ incarnation -> location ++ value`, one duplicate per slot.
        PlainState => "PlainState",
        /// `address ++ incarnation -> code_hash`
        PlainContractCode => "PlainCodeHash",
        /// Values of accounts before block N changed them.
        ///
        /// Logical: `block_number ++ address -> account_before`.
        /// Physical (DupSort): `block_number -> address ++ account_before`.
        AccountChangeSet => "AccountChangeSet",
        /// Values of storage slots before block N changed them.
        ///
        /// Physical (DupSort): `block_number ++ address ++ incarnation -> location ++ value_before`.
        StorageChangeSet => "StorageChangeSet",
        /// `address_hash -> account`
        HashedAccounts => "HashedAccount",
        /// `address_hash ++ incarnation ++ location_hash -> value`, 72-byte keys
        /// folded to a 40-byte DupSort prefix like [`ChaindataTable::PlainState`].
        HashedStorage => "HashedStorage",
        /// `code_hash -> code`
        Code => "Code",
        /// `address_hash ++ incarnation -> code_hash`
        ContractCode => "HashedCodeHash",
        /// `address -> incarnation` of the account when it was last deleted.
        IncarnationMap => "IncarnationMap",
        /// `code_hash -> TEVM code`
        ContractTevmCode => "TEVMCode",

        // ============ History indices ============

        /// Sharded index of blocks in which an account changed.
        ///
        /// `address ++ shard_suffix -> block number set`; see [`crate::layout::history`].
        AccountsHistory => "AccountHistory",
        /// `address ++ location ++ shard_suffix -> block number set`
        StorageHistory => "StorageHistory",

        // ============ Merkle trie ============

        /// Intermediate account trie nodes: `nibble path -> trie node`.
        ///
        /// See [`crate::layout::trie`] for the value layout and its invariants.
        TrieOfAccounts => "TrieAccount",
        /// Intermediate storage trie nodes:
        /// `address_hash ++ incarnation ++ nibble path -> trie node`.
        TrieOfStorage => "TrieStorage",

        // ============ Chain ============

        /// Information about the data layout, e.g. the schema version.
        DatabaseInfo => "DbInfo",
        /// `header_hash -> block_number`
        HeaderNumber => "HeaderNumber",
        /// `block_number -> header_hash`
        CanonicalHeader => "CanonicalHeader",
        /// `block_number ++ header_hash -> header`
        Headers => "Header",
        /// `block_number ++ header_hash -> total difficulty`
        HeadersTotalDifficulty => "HeadersTotalDifficulty",
        /// `block_number ++ header_hash -> block body`
        BlockBody => "BlockBody",
        /// Transactions of canonical blocks: `sequence -> transaction`.
        ///
        /// Ids are canonical, so they are the same on every node regardless of
        /// reorgs. System transactions before and after a block take ids even when
        /// absent.
        BlockTransactions => "BlockTransaction",
        /// Transactions of non-canonical blocks, moved here so a reorg doesn't
        /// need to download them again: `sequence -> transaction`.
        NonCanonicalTransactions => "NonCanonicalTransaction",
        /// `block_number -> receipts` of canonical blocks.
        Receipts => "Receipt",
        /// `block_number ++ transaction_id -> logs`
        TransactionLogs => "TransactionLog",
        /// `block_number ++ block_hash -> senders` (20 bytes per sender).
        Senders => "TxSender",
        /// `transaction_hash -> lookup metadata`
        TransactionLookup => "BlockTransactionLookup",

        // ============ Log and call trace indices ============

        /// Sharded bitmap index of blocks with logs of a topic.
        LogTopicIndex => "LogTopicIndex",
        /// Sharded bitmap index of blocks with logs of an address.
        LogAddressIndex => "LogAddressIndex",
        /// DupSort: `block_number -> address ++ flags`, one bit each for "from"
        /// and "to".
        CallTraceSet => "CallTraceSet",
        /// `address ++ shard_suffix -> block number set` of calls from the address.
        CallFromIndex => "CallFromIndex",
        /// `address ++ shard_suffix -> block number set` of calls to the address.
        CallToIndex => "CallToIndex",
        /// Cumulative indices used to estimate stage execution.
        CumulativeGasIndex => "CumulativeGasIndex",
        CumulativeTransactionIndex => "CumulativeTransactionIndex",

        // ============ Node metadata ============

        /// Chain configuration: `genesis_hash -> config`.
        Config => "Config",
        /// Progress of sync stages: `stage_name -> progress`.
        SyncStageProgress => "SyncStage",
        /// Hash of the latest known full block.
        LastBlock => "LastBlock",
        /// Hash of the latest known header.
        LastHeader => "LastHeader",
        /// Head, safe and finalized hashes of the latest forkchoice update.
        LastForkchoice => "LastForkchoice",
        /// Beacon chain head being executed.
        CurrentExecutionPayload => "CurrentExecutionPayload",
        /// `migration_name -> stage progress` at the time the migration ran.
        Migrations => "Migration",
        /// `table_name -> next sequence value`
        Sequence => "Sequence",
        /// `block_number -> issuance ++ burnt`
        Issuance => "Issuance",

        // ============ Consensus engines ============

        CliqueSeparate => "CliqueSeparate",
        CliqueSnapshot => "CliqueSnapshot",
        CliqueLastSnapshot => "CliqueLastSnapshot",
        /// Parlia validator snapshots: `block_number ++ hash -> snapshot (JSON)`.
        ParliaSnapshot => "ParliaSnapshot",
        /// `block_number ++ block_hash -> transition proof`
        DevEpoch => "DevEpoch",
        /// `block_number ++ block_hash -> transition proof`
        DevPendingEpoch => "DevPendingEpoch",
        BorReceipts => "BorReceipt",
        BorTransactionLookup => "BlockBorTransactionLookup",
        BorSeparate => "BorSeparate",

        // ============ Aggregated state ============

        StateAccounts => "StateAccounts",
        StateStorage => "StateStorage",
        StateCode => "StateCode",
        StateCommitment => "StateCommitment",

        // ============ Domains and inverted indices ============

        AccountKeys => "AccountKeys",
        AccountVals => "AccountVals",
        AccountHistoryKeys => "AccountHistoryKeys",
        AccountHistoryVals => "AccountHistoryVals",
        AccountSettings => "AccountSettings",
        AccountIdx => "AccountIdx",
        StorageKeys => "StorageKeys",
        StorageVals => "StorageVals",
        StorageHistoryKeys => "StorageHistoryKeys",
        StorageHistoryVals => "StorageHistoryVals",
        StorageSettings => "StorageSettings",
        StorageIdx => "StorageIdx",
        CodeKeys => "CodeKeys",
        CodeVals => "CodeVals",
        CodeHistoryKeys => "CodeHistoryKeys",
        CodeHistoryVals => "CodeHistoryVals",
        CodeSettings => "CodeSettings",
        CodeIdx => "CodeIdx",
        LogAddressKeys => "LogAddressKeys",
        LogAddressIdx => "LogAddressIdx",
        LogTopicsKeys => "LogTopicsKeys",
        LogTopicsIdx => "LogTopicsIdx",
        TracesFromKeys => "TracesFromKeys",
        TracesFromIdx => "TracesFromIdx",
        TracesToKeys => "TracesToKeys",
        TracesToIdx => "TracesToIdx",
        /// `snapshot_name -> hash`
        Snapshots => "Snapshots",

        // ============ Reconstitution indices ============

        RAccountKeys => "RAccountKeys",
        RAccountIdx => "RAccountIdx",
        RStorageKeys => "RStorageKeys",
        RStorageIdx => "RStorageIdx",
        RCodeKeys => "RCodeKeys",
        RCodeIdx => "RCodeIdx",
    }
}

/// Chain-data tables that are no longer used.
pub mod deprecated {
    pub const CLIQUE: &str = "Clique";
    /// Tracked the last proof-of-work block.
    pub const TRANSITION_BLOCK: &str = "TransitionBlock";
}

catalog_tables! {
    /// Tables of the transaction pool database.
    pub enum TxPoolTable in Catalog::TxPool {
        /// `sequence -> transaction_hash`
        RecentLocalTransaction => "RecentLocalTransaction",
        /// `transaction_hash -> sender_id ++ transaction`
        PoolTransaction => "PoolTransaction",
        /// `option_key -> option_value`
        PoolInfo => "PoolInfo",
    }
}

catalog_tables! {
    /// Tables of the sentry database. Sentry keeps no tables of its own yet.
    pub enum SentryTable in Catalog::Sentry {}
}

catalog_tables! {
    /// Tables of the snapshot downloader database.
    pub enum DownloaderTable in Catalog::Downloader {
        BittorrentCompletion => "BittorrentCompletion",
        BittorrentInfo => "BittorrentInfo",
    }
}

catalog_tables! {
    /// Scratch tables used while reconstituting state from history.
    pub enum ReconTable in Catalog::Recon {
        XAccount => "XAccount",
        XStorage => "XStorage",
        XCode => "XCode",
        /// Temporary copy of `PlainState` during reconstitution.
        PlainStateR => "PlainStateR",
        /// Temporary copy of `Code` during reconstitution.
        CodeR => "CodeR",
        /// Temporary copy of `PlainCodeHash` during reconstitution.
        PlainContractR => "PlainContractR",
    }
}

/// Names of every table in `catalog`, in declaration order.
pub fn table_names(catalog: Catalog) -> Vec<&'static str> {
    fn names<T: TableId>() -> Vec<&'static str> {
        T::TABLES.iter().map(|table| table.name()).collect()
    }

    match catalog {
        Catalog::Chaindata => names::<ChaindataTable>(),
        Catalog::TxPool => names::<TxPoolTable>(),
        Catalog::Sentry => names::<SentryTable>(),
        Catalog::Downloader => names::<DownloaderTable>(),
        Catalog::Recon => names::<ReconTable>(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn table_names_unique_within_catalog() {
        for catalog in Catalog::ALL {
            let names = table_names(catalog);
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(unique.len(), names.len(), "duplicate name in {catalog}");
            assert!(names.iter().all(|name| !name.is_empty()));
        }
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(ChaindataTable::ALL.len(), 88);
        assert_eq!(TxPoolTable::ALL.len(), 3);
        assert!(SentryTable::ALL.is_empty());
        assert_eq!(DownloaderTable::ALL.len(), 2);
        assert_eq!(ReconTable::ALL.len(), 6);
    }

    #[test]
    fn deprecated_names_are_not_active() {
        let active = table_names(Catalog::Chaindata);
        for name in Catalog::Chaindata.deprecated_tables() {
            assert!(!active.contains(name));
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(
            ChaindataTable::from_name("HashedAccount"),
            Some(ChaindataTable::HashedAccounts)
        );
        assert_eq!(ChaindataTable::from_name("hashedaccount"), None);
        assert_eq!(ChaindataTable::PlainContractCode.to_string(), "PlainCodeHash");
    }

    #[test]
    fn catalog_parses_from_name() {
        assert_eq!("txpool".parse::<Catalog>().unwrap(), Catalog::TxPool);
        assert!(matches!(
            "mempool".parse::<Catalog>(),
            Err(ConfigError::UnknownCatalog { .. })
        ));
    }
}
