use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use czo2hs::config::{load_config, RecordSelection};
use czo2hs::files::{ClassifyPolicy, HttpSizeProbe, SizeCache};
use czo2hs::metadata::GroupDirectory;
use czo2hs::pipeline::{MigrationPolicy, Migrator, ProgressLedger};
use czo2hs::repository::HttpRepositoryClient;
use czo2hs::source::{select_records, JsonRecordProvider, RecordProvider};
use czo2hs::Result;

/// Migrates CZO legacy CMS dataset records into a HydroShare-style repository.
#[derive(Parser, Debug)]
#[command(name = "czo2hs", version, about)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Process only the first N rows (overrides the configured selection)
    #[arg(long, conflicts_with = "id")]
    limit: Option<usize>,

    /// Process only the given czo_id (repeatable; overrides the configured selection)
    #[arg(long = "id")]
    id: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let selection = if let Some(limit) = cli.limit {
        RecordSelection::FirstN(limit)
    } else if !cli.id.is_empty() {
        RecordSelection::Ids(cli.id.clone())
    } else {
        config.selection.clone()
    };

    let client = HttpRepositoryClient::new(
        &config.repository,
        &config.cache_dir,
        config.use_cached_files,
    )?;
    let creators = GroupDirectory::new(&config.groups);
    let probe = HttpSizeProbe::new()?;
    let cache = SizeCache::new();
    let policy = MigrationPolicy {
        classify: ClassifyPolicy {
            big_file_threshold_mb: config.big_file_threshold_mb,
            unknown_size_is_reference: config.unknown_size_is_reference,
        },
        skip_already_migrated: config.skip_already_migrated,
    };
    let migrator = Migrator::new(&client, &creators, &probe, &cache, policy);

    let records = JsonRecordProvider::new(&config.records_path).records()?;
    let records = select_records(records, &selection);
    info!(
        "Connecting to {} as {}; {} record(s) selected",
        config.repository.base_url,
        config.repository.username,
        records.len()
    );

    // Ctrl-C is a soft stop: abandon remaining rows, then summarize and
    // write the lookup table from whatever the ledger holds.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        }) {
            warn!("Could not install interrupt handler: {}", e);
        }
    }

    let run_start = Instant::now();
    let mut ledger = ProgressLedger::new(config.big_file_threshold_mb);

    if let Some(path) = &config.previous_lookup_path {
        let file = std::fs::File::open(path)?;
        let seeded = ledger.seed_from_lookup(std::io::BufReader::new(file))?;
        info!("Seeded {} lookup row(s) from {}", seeded, path);
    }

    for (row, record) in records.iter().enumerate() {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, stopping after {} row(s)", row);
            break;
        }

        let record_start = Instant::now();
        info!(
            "Working on row {}/{}, czo_id {}",
            row + 1,
            records.len(),
            record.source_id().unwrap_or("unknown")
        );

        let result = migrator.migrate(record, &ledger);
        let row_files = result.uploaded_files.len();
        let row_mb = result.total_uploaded_mb;
        ledger.record(result);

        info!(
            "Row done in {:.1?} (elapsed {:.1?}) - Files: {} ({:.2} MB uploaded) - Success: {} - Error: {}",
            record_start.elapsed(),
            run_start.elapsed(),
            row_files,
            row_mb,
            ledger.success_count(),
            ledger.error_count()
        );

        if (row + 1) % 10 == 0 {
            info!(
                "Progress report: {} processed, {} success, {} error, {} skipped",
                row + 1,
                ledger.success_count(),
                ledger.error_count(),
                ledger.skipped_count()
            );
        }
    }

    info!("{}", ledger.summary());

    std::fs::create_dir_all(&config.lookup_dir)?;
    let lookup_path = PathBuf::from(&config.lookup_dir).join(format!(
        "lookup_{}.csv",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let mut lookup_file = std::fs::File::create(&lookup_path)?;
    ledger.write_lookup_table(&mut lookup_file)?;
    info!("Lookup table written to {}", lookup_path.display());

    info!("Total migration time {:.1?}", run_start.elapsed());
    Ok(())
}
