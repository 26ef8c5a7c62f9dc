//! Observation periods

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{CdmError, Result};
use crate::schema::cdm::{
    OBSERVATION_PERIOD_END_DATE, OBSERVATION_PERIOD_ID, OBSERVATION_PERIOD_START_DATE, PERSON_ID,
};
use crate::schema::CdmTable;
use crate::utils::arrow::{date32_column, days_to_date, int64_column};

/// A span of time during which a person's records are considered complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationPeriod {
    pub observation_period_id: i64,
    pub person_id: i64,
    /// First day of the period (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive)
    pub end_date: NaiveDate,
}

impl ObservationPeriod {
    /// Whether a date lies within the period bounds
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Read every row of an `observation_period` table, in file order
    pub fn from_table(rows: &RecordBatch) -> Result<Vec<Self>> {
        let table = CdmTable::ObservationPeriod.name();
        let ids = int64_column(rows, table, OBSERVATION_PERIOD_ID)?;
        let person_ids = int64_column(rows, table, PERSON_ID)?;
        let starts = date32_column(rows, table, OBSERVATION_PERIOD_START_DATE)?;
        let ends = date32_column(rows, table, OBSERVATION_PERIOD_END_DATE)?;

        (0..rows.num_rows())
            .map(|i| {
                if ids.is_null(i) || person_ids.is_null(i) || starts.is_null(i) || ends.is_null(i)
                {
                    return Err(CdmError::InvalidValue(format!(
                        "Observation period row {i} has a null id or date"
                    )));
                }
                Ok(Self {
                    observation_period_id: ids.value(i),
                    person_id: person_ids.value(i),
                    start_date: days_to_date(starts.value(i))?,
                    end_date: days_to_date(ends.value(i))?,
                })
            })
            .collect()
    }
}
