use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use cdm_sequencer::SequenceRow;
use cdm_sequencer::utils::io::read_parquet;
use cdm_sequencer::utils::logging::console::{print_batch_summary, print_row, print_schema_info};
use cdm_sequencer::utils::logging::init_logger;

/// Print the schema and sample rows of a written sequence partition.
#[derive(Parser, Debug)]
#[command(name = "inspect_sequences")]
struct Args {
    /// Sequence partition file, e.g. `person_sequence/part0001.parquet`.
    path: PathBuf,

    /// Number of rows to print.
    #[arg(long, short, default_value = "1")]
    rows: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(None)?;

    let start = Instant::now();
    let batches = read_parquet(&args.path, None)?;
    print_batch_summary(&batches, start.elapsed());

    let Some(first) = batches.first() else {
        println!("No record batches found in {}", args.path.display());
        return Ok(());
    };
    print_schema_info(first);

    for row in 0..args.rows.min(first.num_rows()) {
        print_row(first, row)?;
    }

    let sequences = batches
        .iter()
        .map(SequenceRow::from_record_batch)
        .collect::<cdm_sequencer::Result<Vec<_>>>()?;
    let rows = sequences.iter().flatten().collect::<Vec<_>>();
    let invalid = rows
        .iter()
        .filter(|row| {
            let n = usize::try_from(row.num_of_concepts).unwrap_or(0);
            row.concept_ids.len() != n
                || row.visit_segments.len() != n
                || row.dates.len() != n
                || row.ages.len() != n
                || row.visit_concept_orders.len() != n
                || row.visit_concept_ids.len() != n
                || row.orders.len() != n.saturating_sub(1)
        })
        .count();
    println!("{} sequences, {invalid} with inconsistent array lengths", rows.len());

    Ok(())
}
