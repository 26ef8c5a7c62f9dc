//! Conversion between Arrow Date32 day numbers and calendar dates

use chrono::NaiveDate;

use crate::error::{CdmError, Result};

/// The Date32 epoch
pub const UNIX_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

/// Convert an Arrow Date32 value to `NaiveDate`
pub fn days_to_date(days_since_epoch: i32) -> Result<NaiveDate> {
    UNIX_EPOCH
        .checked_add_signed(chrono::TimeDelta::days(i64::from(days_since_epoch)))
        .ok_or_else(|| CdmError::InvalidValue(format!("Date32 value {days_since_epoch} out of range")))
}

/// Convert a `NaiveDate` to an Arrow Date32 value
#[must_use]
pub fn date_to_days(date: NaiveDate) -> i32 {
    // NaiveDate spans roughly +/- 262_000 years, which always fits
    i32::try_from((date - UNIX_EPOCH).num_days()).unwrap_or(i32::MAX)
}
