//! Assignment of events to visits.
//!
//! Every event of a domain table is linked to the first declared visit that
//! matches it, by `visit_occurrence_id`, by date or by either, according to
//! [`VisitLinking`]. Events that match nothing get a synthetic single-day
//! visit on their date, shared by every later event on that date, or are
//! dropped when synthesis is off.

use arrow::array::{Array, UInt32Array};
use arrow::compute::take_record_batch;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::config::{VisitGroupingOptions, VisitLinking};
use crate::error::{CdmError, Result};
use crate::models::{CdmTables, Visit, VisitBundle};
use crate::schema::CdmTable;
use crate::schema::cdm::VISIT_OCCURRENCE_ID;
use crate::utils::arrow::{date32_column, days_to_date, optional_int64_column};

/// Visit index of every row of one table, `None` for dropped rows
struct TableAssignment {
    table: CdmTable,
    visits: Vec<Option<usize>>,
}

/// Index of the first visit matching an event
fn find_visit(
    visits: &[Visit],
    linking: VisitLinking,
    visit_id: Option<i64>,
    date: Option<NaiveDate>,
) -> Option<usize> {
    visits.iter().position(|visit| {
        let by_id = linking.uses_id() && visit_id.is_some() && visit.visit_occurrence_id == visit_id;
        let by_date = linking.uses_date() && date.is_some_and(|date| visit.contains(date));
        by_id || by_date
    })
}

/// Group the domain events of a period into visit bundles
///
/// Bundles are ordered by visit start date; ties keep declaration order, so
/// recorded visits precede synthesized ones. Visits without events still
/// produce an empty bundle.
pub fn group_by_visit(
    tables: &CdmTables,
    options: &VisitGroupingOptions,
) -> Result<Vec<VisitBundle>> {
    let mut visits = match tables.get(CdmTable::VisitOccurrence) {
        Some(rows) => Visit::from_table(rows)?,
        None => Vec::new(),
    };
    let mut synthetic_by_date: FxHashMap<NaiveDate, usize> = FxHashMap::default();
    let mut assignments = Vec::new();

    for table in CdmTable::DOMAIN {
        let Some(rows) = tables.get(table).filter(|rows| rows.num_rows() > 0) else {
            continue;
        };
        let date_column = table
            .start_date_column()
            .ok_or_else(|| CdmError::malformed(table.name(), "start date", "is not defined"))?;
        let dates = date32_column(rows, table.name(), date_column)?;
        let visit_ids = if options.linking.uses_id() {
            optional_int64_column(rows, table.name(), VISIT_OCCURRENCE_ID)?
        } else {
            None
        };

        let mut assigned = Vec::with_capacity(rows.num_rows());
        for row in 0..rows.num_rows() {
            let date = if dates.is_null(row) {
                None
            } else {
                Some(days_to_date(dates.value(row))?)
            };
            let visit_id = visit_ids
                .as_ref()
                .filter(|ids| !ids.is_null(row))
                .map(|ids| ids.value(row));

            let mut index = find_visit(&visits, options.linking, visit_id, date);
            if index.is_none() && options.create_missing_visits {
                // Undated events cannot be given a visit
                index = date.map(|date| {
                    *synthetic_by_date.entry(date).or_insert_with(|| {
                        visits.push(Visit::synthetic(date, options.missing_visit_concept_id));
                        visits.len() - 1
                    })
                });
            }
            assigned.push(index);
        }

        let dropped = assigned.iter().filter(|index| index.is_none()).count();
        if dropped > 0 {
            log::debug!("Dropped {dropped} events of '{table}' without a visit");
        }
        assignments.push(TableAssignment {
            table,
            visits: assigned,
        });
    }

    let mut bundles = visits.into_iter().map(VisitBundle::new).collect::<Vec<_>>();
    for assignment in assignments {
        let Some(rows) = tables.get(assignment.table) else {
            continue;
        };
        let mut rows_per_visit: Vec<Vec<u32>> = vec![Vec::new(); bundles.len()];
        for (row, index) in assignment.visits.iter().enumerate() {
            if let Some(index) = index {
                let row = u32::try_from(row).map_err(|_| {
                    CdmError::InvalidValue(format!("'{}' has too many rows", assignment.table))
                })?;
                rows_per_visit[*index].push(row);
            }
        }

        for (bundle, indices) in bundles.iter_mut().zip(rows_per_visit) {
            if !indices.is_empty() {
                let events = take_record_batch(rows, &UInt32Array::from(indices))?;
                bundle.tables.insert(assignment.table, events);
            }
        }
    }

    bundles.sort_by_key(|bundle| bundle.visit.start_date);
    Ok(bundles)
}
