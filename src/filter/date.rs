//! Date filtering functionality for record batches
//!
//! This module provides filtering of a table by an inclusive date range on
//! its start-date column.

use arrow::array::Date32Array;
use arrow::compute::kernels::{boolean, cmp};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::filter::core::{BatchFilter, filter_record_batch};
use crate::utils::arrow::{date_to_days, date32_column};

/// A filter that includes only rows with dates in a specified range
#[derive(Debug, Clone)]
pub struct DateRangeFilter {
    /// The name of the date column
    date_column: String,

    /// The start date (inclusive)
    start_date: NaiveDate,

    /// The end date (inclusive)
    end_date: NaiveDate,
}

impl DateRangeFilter {
    /// Create a new date range filter
    ///
    /// # Arguments
    /// * `date_column` - The name of the date column
    /// * `start_date` - Start date (inclusive)
    /// * `end_date` - End date (inclusive)
    #[must_use]
    pub fn new(date_column: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            date_column: date_column.into(),
            start_date,
            end_date,
        }
    }
}

impl BatchFilter for DateRangeFilter {
    fn filter(&self, table: &str, batch: &RecordBatch) -> Result<RecordBatch> {
        let dates = date32_column(batch, table, &self.date_column)?;
        if dates.is_empty() {
            return Ok(batch.clone());
        }

        let start = Date32Array::new_scalar(date_to_days(self.start_date));
        let end = Date32Array::new_scalar(date_to_days(self.end_date));

        // Null dates compare as null, which the filter kernel drops
        let in_range = boolean::and(&cmp::gt_eq(&dates, &start)?, &cmp::lt_eq(&dates, &end)?)?;

        filter_record_batch(batch, &in_range)
    }
}
