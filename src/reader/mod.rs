//! Person-grouped streaming over one table partition.
//!
//! A [`TableStreamReader`] turns the record batches of a person-sorted
//! partition file into one [`PersonGroup`] per person, in ascending person id
//! order. Runs of the same person that straddle Parquet batch boundaries are
//! buffered as slices and concatenated once the next person starts, so at most
//! one person's rows are held in memory at a time.

use std::collections::VecDeque;
use std::path::Path;

use arrow::array::Array;
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;

use crate::error::{CdmError, Result};
use crate::models::PersonGroup;
use crate::schema::{CdmTable, PERSON_ID};
use crate::utils::arrow::int64_column;
use crate::utils::io::{open_parquet_reader, partition_path};

type BatchSource = Box<dyn Iterator<Item = Result<RecordBatch>> + Send>;

/// Lazy, finite iterator of per-person row groups of one table partition
pub struct TableStreamReader {
    table: CdmTable,
    partition: usize,
    source: BatchSource,
    /// Slices of the person currently being accumulated
    pending: Vec<RecordBatch>,
    current: Option<i64>,
    ready: VecDeque<PersonGroup>,
    failure: Option<CdmError>,
    done: bool,
}

impl TableStreamReader {
    /// Open partition `partition` (0-based) of `table`
    ///
    /// A missing partition file yields an empty stream.
    pub fn open(
        cdm_data_path: &Path,
        table: CdmTable,
        partition: usize,
        batch_size: usize,
    ) -> Result<Self> {
        let path = partition_path(cdm_data_path, table, partition);
        if !path.is_file() {
            log::debug!("No {table} file for partition {partition} at {}", path.display());
            return Ok(Self::with_source(table, partition, Box::new(std::iter::empty())));
        }

        let reader = open_parquet_reader(&path, None, batch_size)?;
        Ok(Self::with_source(
            table,
            partition,
            Box::new(reader.map(|batch| batch.map_err(CdmError::from))),
        ))
    }

    /// Build a stream over in-memory batches
    #[must_use]
    pub fn from_batches(table: CdmTable, partition: usize, batches: Vec<RecordBatch>) -> Self {
        Self::with_source(table, partition, Box::new(batches.into_iter().map(Ok)))
    }

    fn with_source(table: CdmTable, partition: usize, source: BatchSource) -> Self {
        Self {
            table,
            partition,
            source,
            pending: Vec::new(),
            current: None,
            ready: VecDeque::new(),
            failure: None,
            done: false,
        }
    }

    #[must_use]
    pub const fn table(&self) -> CdmTable {
        self.table
    }

    #[must_use]
    pub const fn partition_index(&self) -> usize {
        self.partition
    }

    /// Split a batch into runs of equal person id
    fn split(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.num_rows() == 0 {
            return Ok(());
        }

        let table = self.table.name();
        let ids = int64_column(batch, table, PERSON_ID)?;
        if ids.null_count() > 0 {
            return Err(CdmError::malformed(table, PERSON_ID, "contains null values"));
        }

        let mut start = 0;
        for i in 1..=ids.len() {
            if i < ids.len() && ids.value(i) == ids.value(start) {
                continue;
            }
            self.push_run(ids.value(start), batch.slice(start, i - start))?;
            start = i;
        }
        Ok(())
    }

    fn push_run(&mut self, person_id: i64, rows: RecordBatch) -> Result<()> {
        match self.current {
            Some(current) if current == person_id => {}
            Some(current) if person_id < current => {
                return Err(CdmError::OrderingViolation {
                    table: self.table.name().to_string(),
                    partition: self.partition,
                    previous: current,
                    current: person_id,
                });
            }
            _ => {
                self.flush()?;
                self.current = Some(person_id);
            }
        }
        self.pending.push(rows);
        Ok(())
    }

    /// Move the accumulated person into the ready queue
    fn flush(&mut self) -> Result<()> {
        let Some(person_id) = self.current.take() else {
            return Ok(());
        };
        let rows = match self.pending.len() {
            1 => self.pending.remove(0),
            _ => concat_batches(&self.pending[0].schema(), &self.pending)?,
        };
        self.pending.clear();
        self.ready.push_back(PersonGroup { person_id, rows });
        Ok(())
    }

    fn fail(&mut self, error: CdmError) {
        self.pending.clear();
        self.current = None;
        self.failure = Some(error);
        self.done = true;
    }
}

impl Iterator for TableStreamReader {
    type Item = Result<PersonGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Groups completed before a failure are still yielded first
            if let Some(group) = self.ready.pop_front() {
                return Some(Ok(group));
            }
            if let Some(error) = self.failure.take() {
                return Some(Err(error));
            }
            if self.done {
                return None;
            }

            match self.source.next() {
                Some(Ok(batch)) => {
                    if let Err(e) = self.split(&batch) {
                        self.fail(e);
                    }
                }
                Some(Err(e)) => self.fail(e),
                None => {
                    self.done = true;
                    if let Err(e) = self.flush() {
                        self.failure = Some(e);
                    }
                }
            }
        }
    }
}

impl std::iter::FusedIterator for TableStreamReader {}
