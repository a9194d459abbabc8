use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::ExitCode,
};

use chainkv_storage::{
    Catalog, Registry, Store, Violation,
    layout::{HISTORY_LAYOUTS, TrieLayout},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Parser)]
#[command(name = "chainkv", version, about = "Inspect the table schema of the chain database")]
struct CliOptions {
    /// Print the gathered Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Print the finalized tables of a catalog
    Tables {
        #[arg(long, default_value = "chaindata")]
        catalog: Catalog,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load a dataset into memory and check the layout of its indices and tries
    Check {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

/// A chain-data sample: table name to hex-encoded logical pairs.
#[derive(Debug, Deserialize)]
struct Dataset {
    tables: BTreeMap<String, Vec<(String, String)>>,
}

#[derive(Debug, Serialize)]
struct TableRow<'a> {
    ordinal: Option<usize>,
    name: &'a str,
    flags: String,
    deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dup_sort_conversion: Option<[usize; 2]>,
}

fn main() -> ExitCode {
    let options = CliOptions::parse();
    init_logging();

    let status = match options.command {
        Command::Tables { catalog, json } => {
            print_tables(catalog, json);
            ExitCode::SUCCESS
        }
        Command::Check { file } => check_dataset(&file),
    };

    if options.metrics {
        let metrics =
            chainkv_metrics::gather_default_metrics().expect("Failed to gather metrics");
        print!("{metrics}");
    }
    status
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chainkv=info,chainkv_storage=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_tables(catalog: Catalog, json: bool) {
    let config = Registry::builtin().catalog(catalog);
    let rows: Vec<TableRow> = config
        .iter()
        .chain(config.deprecated().filter(|(_, table)| table.ordinal.is_none()))
        .map(|(name, table)| TableRow {
            ordinal: table.ordinal,
            name,
            flags: table.flags.to_string(),
            deprecated: table.is_deprecated,
            dup_sort_conversion: table
                .dup_sort_conversion
                .map(|conversion| [conversion.from_len, conversion.to_len]),
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&rows).expect("Failed to serialize tables");
        println!("{out}");
        return;
    }

    println!("{:>4}  {:<32} {:<24} {}", "#", "name", "flags", "notes");
    for row in &rows {
        let ordinal = row.ordinal.map(|o| o.to_string()).unwrap_or_default();
        let mut notes = Vec::new();
        if row.deprecated {
            notes.push("deprecated".to_owned());
        }
        if let Some([from_len, to_len]) = row.dup_sort_conversion {
            notes.push(format!("dupsort {from_len}->{to_len}"));
        }
        println!(
            "{:>4}  {:<32} {:<24} {}",
            ordinal,
            row.name,
            row.flags,
            notes.join(", ")
        );
    }
}

fn check_dataset(file: &Path) -> ExitCode {
    let content = std::fs::read_to_string(file).expect("Failed to read dataset file");
    let dataset: Dataset = serde_json::from_str(&content).expect("Failed to parse dataset file");

    let store = Store::in_memory(Registry::builtin().catalog(Catalog::Chaindata));
    for (table, entries) in dataset.tables {
        let entries: Vec<_> = entries
            .iter()
            .map(|(key, value)| {
                let key = hex::decode(key).expect("Dataset keys are hex");
                let value = hex::decode(value).expect("Dataset values are hex");
                (key, value)
            })
            .collect();
        let count = entries.len();
        store
            .put_batch(&table, entries)
            .unwrap_or_else(|err| panic!("Failed to load table {table}: {err}"));
        info!(%table, entries = count, "Loaded table");
    }

    let mut violations: Vec<(&str, Violation)> = Vec::new();
    for layout in &HISTORY_LAYOUTS {
        let found = store.check_history(layout).expect("History check failed");
        violations.extend(found.into_iter().map(|violation| (layout.table, violation)));
    }
    for layout in [TrieLayout::ACCOUNT_TRIE, TrieLayout::STORAGE_TRIE] {
        let found = store.check_trie(&layout).expect("Trie check failed");
        violations.extend(found.into_iter().map(|violation| (layout.table, violation)));
    }

    if violations.is_empty() {
        println!("No violations found");
        return ExitCode::SUCCESS;
    }
    for (table, violation) in &violations {
        println!("{table}: [{}] {violation}", violation.kind());
    }
    warn!(count = violations.len(), "Dataset violates the table layouts");
    ExitCode::FAILURE
}
