//! Table-sets and per-person row groups

use std::collections::BTreeMap;
use std::collections::btree_map;

use arrow::record_batch::RecordBatch;

use crate::schema::CdmTable;

/// All rows of one person in one table of one partition
#[derive(Debug, Clone)]
pub struct PersonGroup {
    pub person_id: i64,
    pub rows: RecordBatch,
}

impl PersonGroup {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.num_rows()
    }
}

/// A mapping from table to its rows, all belonging to one person
///
/// Iteration follows [`CdmTable`] declaration order, so output built from a
/// table-set does not depend on insertion order.
#[derive(Debug, Clone, Default)]
pub struct CdmTables {
    tables: BTreeMap<CdmTable, RecordBatch>,
}

impl CdmTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the rows of a table
    pub fn insert(&mut self, table: CdmTable, rows: RecordBatch) {
        self.tables.insert(table, rows);
    }

    #[must_use]
    pub fn get(&self, table: CdmTable) -> Option<&RecordBatch> {
        self.tables.get(&table)
    }

    pub fn remove(&mut self, table: CdmTable) -> Option<RecordBatch> {
        self.tables.remove(&table)
    }

    #[must_use]
    pub fn contains(&self, table: CdmTable) -> bool {
        self.tables.contains_key(&table)
    }

    /// Number of rows of a table, 0 when absent
    #[must_use]
    pub fn num_rows(&self, table: CdmTable) -> usize {
        self.get(table).map_or(0, RecordBatch::num_rows)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, CdmTable, RecordBatch> {
        self.tables.iter()
    }
}

impl<'a> IntoIterator for &'a CdmTables {
    type Item = (&'a CdmTable, &'a RecordBatch);
    type IntoIter = btree_map::Iter<'a, CdmTable, RecordBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

impl IntoIterator for CdmTables {
    type Item = (CdmTable, RecordBatch);
    type IntoIter = btree_map::IntoIter<CdmTable, RecordBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl FromIterator<(CdmTable, RecordBatch)> for CdmTables {
    fn from_iter<I: IntoIterator<Item = (CdmTable, RecordBatch)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// The combined table-set of one person, as produced by the merge-join
#[derive(Debug, Clone)]
pub struct PersonTables {
    pub person_id: i64,
    pub tables: CdmTables,
}
