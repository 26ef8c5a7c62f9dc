//! Visits and visit bundles

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{CdmError, Result};
use crate::models::tables::CdmTables;
use crate::schema::cdm::{VISIT_CONCEPT_ID, VISIT_END_DATE, VISIT_OCCURRENCE_ID, VISIT_START_DATE};
use crate::schema::CdmTable;
use crate::utils::arrow::{date32_column, days_to_date, int64_column};

/// A clinical encounter, recorded or synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// `None` for synthesized visits
    pub visit_occurrence_id: Option<i64>,
    pub visit_concept_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Visit {
    /// A single-day visit created for events that match no recorded visit
    #[must_use]
    pub const fn synthetic(date: NaiveDate, visit_concept_id: i64) -> Self {
        Self {
            visit_occurrence_id: None,
            visit_concept_id,
            start_date: date,
            end_date: date,
        }
    }

    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.visit_occurrence_id.is_none()
    }

    /// Whether a date lies within the visit's start and end dates (inclusive)
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Read every row of a `visit_occurrence` table, in file order
    ///
    /// A null end date is taken as the start date; a null visit concept is 0.
    pub fn from_table(rows: &RecordBatch) -> Result<Vec<Self>> {
        let table = CdmTable::VisitOccurrence.name();
        let ids = int64_column(rows, table, VISIT_OCCURRENCE_ID)?;
        let concepts = int64_column(rows, table, VISIT_CONCEPT_ID)?;
        let starts = date32_column(rows, table, VISIT_START_DATE)?;
        let ends = date32_column(rows, table, VISIT_END_DATE)?;

        (0..rows.num_rows())
            .map(|i| {
                if starts.is_null(i) {
                    return Err(CdmError::InvalidValue(format!(
                        "Visit row {i} has a null {VISIT_START_DATE}"
                    )));
                }
                let start_date = days_to_date(starts.value(i))?;
                let end_date = if ends.is_null(i) {
                    start_date
                } else {
                    days_to_date(ends.value(i))?
                };
                Ok(Self {
                    visit_occurrence_id: (!ids.is_null(i)).then(|| ids.value(i)),
                    visit_concept_id: if concepts.is_null(i) { 0 } else { concepts.value(i) },
                    start_date,
                    end_date,
                })
            })
            .collect()
    }
}

/// A visit and the events assigned to it, keyed by table
#[derive(Debug, Clone)]
pub struct VisitBundle {
    pub visit: Visit,
    pub tables: CdmTables,
}

impl VisitBundle {
    #[must_use]
    pub fn new(visit: Visit) -> Self {
        Self {
            visit,
            tables: CdmTables::new(),
        }
    }

    /// Number of events across all tables of the bundle
    #[must_use]
    pub fn num_events(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows.num_rows()).sum()
    }
}
