use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use cdm_sequencer::utils::logging::init_logger;
use cdm_sequencer::{
    CehrBertProcessor, OrphanPolicy, ProcessorConfig, VisitLinking, process_cdm_data,
};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

/// Convert OMOP CDM Parquet partitions into CEHR-BERT sequences.
///
/// Every table is read from `<cdm-data-path>/<table>/part0001.parquet`,
/// `part0002.parquet`, ... and all tables must be partitioned identically and
/// sorted by person_id.
#[derive(Parser, Debug)]
#[command(name = "cdm-sequencer", version)]
struct Args {
    /// Directory holding one sub-directory per CDM table, including the
    /// `concept` and `concept_ancestor` vocabulary tables.
    #[arg(long, env = "CDM_DATA_PATH")]
    cdm_data_path: PathBuf,

    /// Directory the sequence partitions, run summary and log are written to.
    #[arg(long, env = "CDM_OUTPUT_PATH")]
    output_path: PathBuf,

    /// Maximum worker threads. 0 uses every CPU; -1 processes only the first
    /// partition on the main thread, for debugging.
    #[arg(long, default_value = "0", env = "CDM_MAX_CORES", allow_hyphen_values = true)]
    max_cores: i32,

    /// How events are linked to recorded visits: id, date or id-or-date.
    #[arg(long, default_value = "id-or-date")]
    visit_linking: VisitLinking,

    /// Drop events that match no recorded visit instead of creating a
    /// single-day visit for them.
    #[arg(long)]
    no_missing_visits: bool,

    /// Visit concept id given to created visits.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    missing_visit_concept_id: i64,

    /// What to do with rows whose person is absent from the person table:
    /// skip or fail.
    #[arg(long, default_value = "skip")]
    orphan_policy: OrphanPolicy,

    /// Rows per Parquet read batch.
    #[arg(long, env = "CDM_BATCH_SIZE")]
    batch_size: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(Some(&args.output_path))?;

    let mut config = ProcessorConfig::new(&args.cdm_data_path, &args.output_path)
        .with_max_cores(args.max_cores)
        .with_visit_linking(args.visit_linking)
        .with_missing_visits(!args.no_missing_visits, args.missing_visit_concept_id)
        .with_orphan_policy(args.orphan_policy);
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }

    info!(
        "Converting CDM data in {} to CEHR-BERT sequences in {}",
        config.cdm_data_path.display(),
        config.output_path.display()
    );

    let mut processor = CehrBertProcessor::new(config.clone());
    let summary = process_cdm_data(&mut processor, &config)?;

    let failed = summary
        .failures()
        .map(|outcome| outcome.partition)
        .collect::<Vec<_>>();
    if !failed.is_empty() {
        error!("Failed partitions: {failed:?}");
        anyhow::bail!(
            "{} of {} partitions failed",
            failed.len(),
            summary.partitions.len()
        );
    }

    info!("Done");
    Ok(())
}
