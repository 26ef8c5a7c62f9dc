//! Observation-period segmentation of a person's tables

use crate::error::Result;
use crate::filter::{BatchFilter, DateRangeFilter};
use crate::models::{CdmTables, ObservationPeriod};
use crate::schema::CdmTable;

/// Restrict every dated table to rows starting inside `period`
///
/// Tables without a start-date column are passed through unchanged; rows
/// with a null start date are dropped.
pub fn filter_to_period(tables: &CdmTables, period: &ObservationPeriod) -> Result<CdmTables> {
    tables
        .iter()
        .map(|(&table, rows)| {
            let rows = match table.start_date_column() {
                Some(column) => DateRangeFilter::new(column, period.start_date, period.end_date)
                    .filter(table.name(), rows)?,
                None => rows.clone(),
            };
            Ok((table, rows))
        })
        .collect()
}

/// Call `handler` once per observation period of the person, in file order
///
/// Overlapping periods each receive every event they contain. A person
/// without an `observation_period` table has no periods.
pub fn for_each_observation_period<F>(tables: &CdmTables, mut handler: F) -> Result<()>
where
    F: FnMut(&ObservationPeriod, CdmTables) -> Result<()>,
{
    let Some(rows) = tables.get(CdmTable::ObservationPeriod) else {
        return Ok(());
    };

    for period in ObservationPeriod::from_table(rows)? {
        let period_tables = filter_to_period(tables, &period)?;
        handler(&period, period_tables)?;
    }
    Ok(())
}
