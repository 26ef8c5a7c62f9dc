//! Partition-local merge-join of person-sorted table streams.
//!
//! The person table is the anchor. Every other table keeps a single
//! lookahead group; for each anchor person the lookahead is advanced past
//! smaller ids (orphans), attached when it matches, and left untouched when it
//! belongs to a later person.

use std::cmp::Ordering;
use std::path::Path;

use crate::config::OrphanPolicy;
use crate::error::{CdmError, Result};
use crate::models::{CdmTables, PersonGroup, PersonTables};
use crate::reader::TableStreamReader;
use crate::schema::CdmTable;

/// Counters of one merge-join run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Anchor persons yielded
    pub persons: usize,
    /// Groups dropped because their person is not in the anchor
    pub orphan_groups: usize,
    pub orphan_rows: usize,
}

struct JoinedStream {
    reader: TableStreamReader,
    lookahead: Option<PersonGroup>,
}

impl JoinedStream {
    /// Advance to `person_id` and take its rows if the stream has any
    fn advance_to(
        &mut self,
        person_id: i64,
        policy: OrphanPolicy,
        stats: &mut MergeStats,
    ) -> Result<Option<PersonGroup>> {
        loop {
            let group = match self.lookahead.take() {
                Some(group) => group,
                None => match self.reader.next() {
                    Some(group) => group?,
                    None => return Ok(None),
                },
            };

            match group.person_id.cmp(&person_id) {
                Ordering::Less => self.orphan(&group, policy, stats)?,
                Ordering::Equal => return Ok(Some(group)),
                Ordering::Greater => {
                    self.lookahead = Some(group);
                    return Ok(None);
                }
            }
        }
    }

    /// Consume every group left after the anchor is exhausted
    fn drain(&mut self, policy: OrphanPolicy, stats: &mut MergeStats) -> Result<()> {
        if let Some(group) = self.lookahead.take() {
            self.orphan(&group, policy, stats)?;
        }
        while let Some(group) = self.reader.next() {
            self.orphan(&group?, policy, stats)?;
        }
        Ok(())
    }

    fn orphan(
        &self,
        group: &PersonGroup,
        policy: OrphanPolicy,
        stats: &mut MergeStats,
    ) -> Result<()> {
        match policy {
            OrphanPolicy::Skip => {
                log::warn!(
                    "Skipping {} rows of '{}' in partition {} for person {} without a person row",
                    group.num_rows(),
                    self.reader.table(),
                    self.reader.partition_index(),
                    group.person_id
                );
                stats.orphan_groups += 1;
                stats.orphan_rows += group.num_rows();
                Ok(())
            }
            OrphanPolicy::Fail => Err(CdmError::OrphanRows {
                table: self.reader.table().name().to_string(),
                partition: self.reader.partition_index(),
                person_id: group.person_id,
                rows: group.num_rows(),
            }),
        }
    }
}

/// Iterator of the combined table-set of every person of one partition
///
/// After the first error the iterator is exhausted.
pub struct PartitionMergeJoin {
    anchor: TableStreamReader,
    streams: Vec<JoinedStream>,
    policy: OrphanPolicy,
    stats: MergeStats,
    finished: bool,
}

impl PartitionMergeJoin {
    /// Join pre-built streams onto an anchor stream of person rows
    #[must_use]
    pub fn new(
        anchor: TableStreamReader,
        streams: Vec<TableStreamReader>,
        policy: OrphanPolicy,
    ) -> Self {
        Self {
            anchor,
            streams: streams
                .into_iter()
                .map(|reader| JoinedStream {
                    reader,
                    lookahead: None,
                })
                .collect(),
            policy,
            stats: MergeStats::default(),
            finished: false,
        }
    }

    /// Open the person table and `tables` of one partition
    pub fn open(
        cdm_data_path: &Path,
        partition: usize,
        tables: &[CdmTable],
        batch_size: usize,
        policy: OrphanPolicy,
    ) -> Result<Self> {
        let anchor =
            TableStreamReader::open(cdm_data_path, CdmTable::Person, partition, batch_size)?;
        let streams = tables
            .iter()
            .filter(|&&table| table != CdmTable::Person)
            .map(|&table| TableStreamReader::open(cdm_data_path, table, partition, batch_size))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(anchor, streams, policy))
    }

    #[must_use]
    pub const fn stats(&self) -> MergeStats {
        self.stats
    }

    fn join(&mut self, person: PersonGroup) -> Result<PersonTables> {
        if person.num_rows() != 1 {
            return Err(CdmError::CardinalityViolation {
                table: CdmTable::Person.name().to_string(),
                person_id: person.person_id,
                rows: person.num_rows(),
            });
        }

        let person_id = person.person_id;
        let mut tables = CdmTables::new();
        tables.insert(CdmTable::Person, person.rows);
        for stream in &mut self.streams {
            if let Some(group) = stream.advance_to(person_id, self.policy, &mut self.stats)? {
                tables.insert(stream.reader.table(), group.rows);
            }
        }

        self.stats.persons += 1;
        Ok(PersonTables { person_id, tables })
    }

    fn drain(&mut self) -> Result<()> {
        for stream in &mut self.streams {
            stream.drain(self.policy, &mut self.stats)?;
        }
        if self.stats.orphan_groups > 0 {
            log::warn!(
                "Skipped {} orphan rows in {} groups",
                self.stats.orphan_rows,
                self.stats.orphan_groups
            );
        }
        Ok(())
    }
}

impl Iterator for PartitionMergeJoin {
    type Item = Result<PersonTables>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.anchor.next() {
            Some(Ok(person)) => self.join(person),
            Some(Err(e)) => Err(e),
            None => {
                self.finished = true;
                return self.drain().err().map(Err);
            }
        };
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for PartitionMergeJoin {}
