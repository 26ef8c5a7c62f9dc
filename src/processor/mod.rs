//! Partition-parallel processing of a CDM dataset.
//!
//! A [`CdmProcessor`] receives the merge-joined tables of every person, one
//! partition at a time. [`process_cdm_data`] drives the processor over all
//! partitions on a rayon pool, isolating failures at partition boundaries,
//! and records the outcome of each partition in a [`RunSummary`].

pub mod cehr_bert;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::{error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ProcessorConfig;
use crate::error::{CdmError, Result};
use crate::merge::{MergeStats, PartitionMergeJoin};
use crate::models::PersonTables;
use crate::schema::CdmTable;
use crate::utils::io::count_partitions;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

pub use cehr_bert::CehrBertProcessor;

/// Summary file written into the output directory of a run
pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

/// Lifecycle hooks of a person-level processor
///
/// `prepare` runs once before any partition; the other hooks run on worker
/// threads, once per partition and once per person respectively.
pub trait CdmProcessor: Sync {
    /// Per-partition accumulator, owned by one worker
    type PartitionState: Send;

    fn prepare(&mut self) -> Result<()>;

    fn prepare_partition(&self, partition: usize) -> Result<Self::PartitionState>;

    fn process_person(&self, state: &mut Self::PartitionState, person: PersonTables)
    -> Result<()>;

    fn finish_partition(&self, partition: usize, state: Self::PartitionState) -> Result<()>;
}

/// Result of processing one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOutcome {
    /// 0-based partition index
    pub partition: usize,
    pub persons: usize,
    pub orphan_rows: usize,
    pub elapsed_ms: u64,
    /// Error message when the partition failed
    pub error: Option<String>,
}

impl PartitionOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of every partition of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub partitions: Vec<PartitionOutcome>,
}

impl RunSummary {
    /// Partitions that failed
    pub fn failures(&self) -> impl Iterator<Item = &PartitionOutcome> {
        self.partitions.iter().filter(|outcome| !outcome.is_success())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    #[must_use]
    pub fn persons(&self) -> usize {
        self.partitions.iter().map(|outcome| outcome.persons).sum()
    }

    /// Write the summary as `run_summary.json` into `dir`
    pub fn write(&self, dir: &Path) -> Result<()> {
        let file = File::create(dir.join(SUMMARY_FILE_NAME))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

fn process_partition<P: CdmProcessor>(
    processor: &P,
    config: &ProcessorConfig,
    partition: usize,
    current_person: &mut Option<i64>,
) -> Result<MergeStats> {
    let mut state = processor.prepare_partition(partition)?;
    let mut merge = PartitionMergeJoin::open(
        &config.cdm_data_path,
        partition,
        &CdmTable::JOINED,
        config.batch_size,
        config.orphan_policy,
    )?;

    for person in merge.by_ref() {
        let person = person?;
        *current_person = Some(person.person_id);
        processor.process_person(&mut state, person)?;
        *current_person = None;
    }

    processor.finish_partition(partition, state)?;
    Ok(merge.stats())
}

/// Process one partition, turning any failure into an outcome
pub fn run_partition<P: CdmProcessor>(
    processor: &P,
    config: &ProcessorConfig,
    partition: usize,
) -> PartitionOutcome {
    let start = Instant::now();
    let mut current_person = None;
    let result = process_partition(processor, config, partition, &mut current_person);
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(stats) => PartitionOutcome {
            partition,
            persons: stats.persons,
            orphan_rows: stats.orphan_rows,
            elapsed_ms,
            error: None,
        },
        Err(e) => {
            let e = e.in_partition(partition, current_person);
            error!("{e}");
            PartitionOutcome {
                partition,
                persons: 0,
                orphan_rows: 0,
                elapsed_ms,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Run `processor` over every partition of the dataset
///
/// With `max_cores == -1` only the first partition is processed, on the
/// calling thread. The returned summary is also written to the output
/// directory; a failed partition does not stop the others.
pub fn process_cdm_data<P: CdmProcessor>(
    processor: &mut P,
    config: &ProcessorConfig,
) -> Result<RunSummary> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_path)?;

    let start = Instant::now();
    let partitions = count_partitions(&config.cdm_data_path)?;
    processor.prepare()?;
    let processor = &*processor;

    let outcomes = if config.is_single_partition_debug() {
        info!("Debug mode: processing only the first partition on the main thread");
        (0..partitions.min(1))
            .map(|partition| run_partition(processor, config, partition))
            .collect()
    } else {
        let threads = config.worker_threads();
        info!("Processing {partitions} partitions with {threads} threads");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CdmError::Config(format!("Failed to build thread pool: {e}")))?;

        let pb = create_main_progress_bar(partitions as u64, Some("Processing partitions"));
        let outcomes = pool.install(|| {
            (0..partitions)
                .into_par_iter()
                .map(|partition| {
                    let outcome = run_partition(processor, config, partition);
                    pb.inc(1);
                    outcome
                })
                .collect::<Vec<_>>()
        });
        finish_progress_bar(&pb, Some("Partitions complete"));
        outcomes
    };

    let summary = RunSummary {
        partitions: outcomes,
    };
    summary.write(&config.output_path)?;

    let failed = summary.failures().count();
    info!(
        "Processed {} persons in {} partitions in {:?} ({failed} failed)",
        summary.persons(),
        summary.partitions.len(),
        start.elapsed()
    );
    Ok(summary)
}
