//! Module for converting source arrays to Int64 and Date32.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, LargeStringArray, StringArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;

use crate::error::{CdmError, Result};
use crate::schema::adapt::date_utils::{DateFormatConfig, parse_date_string};
use crate::utils::arrow::conversion::UNIX_EPOCH;

/// Convert an id or concept column to Int64
///
/// Integers of any width, unsigned integers, floats and decimal strings are
/// accepted. Values that do not fit become null.
pub fn to_int64(array: &ArrayRef, table: &str, column: &str) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Int64 => Ok(array.clone()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Null => Ok(cast::cast(array, &DataType::Int64)?),
        other => Err(CdmError::malformed(
            table,
            column,
            format!("has type {other:?}, expected an integer"),
        )),
    }
}

/// Convert a date column to Date32
///
/// Date64 and timestamps are truncated to the day; strings are parsed with
/// the formats in `date_config`, unparseable strings become null.
pub fn to_date32(
    array: &ArrayRef,
    table: &str,
    column: &str,
    date_config: &DateFormatConfig,
) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Date32 => Ok(array.clone()),
        DataType::Date64 | DataType::Timestamp(_, _) | DataType::Null => {
            Ok(cast::cast(array, &DataType::Date32)?)
        }
        DataType::Utf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| CdmError::malformed(table, column, "is not a Utf8 array"))?;
            Ok(strings_to_date32(strings.iter(), date_config))
        }
        DataType::LargeUtf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .ok_or_else(|| CdmError::malformed(table, column, "is not a LargeUtf8 array"))?;
            Ok(strings_to_date32(strings.iter(), date_config))
        }
        other => Err(CdmError::malformed(
            table,
            column,
            format!("has type {other:?}, expected a date"),
        )),
    }
}

fn strings_to_date32<'a>(
    values: impl Iterator<Item = Option<&'a str>>,
    date_config: &DateFormatConfig,
) -> ArrayRef {
    let days: Date32Array = values
        .map(|value| {
            value
                .and_then(|s| parse_date_string(s, date_config))
                .and_then(|date| i32::try_from((date - UNIX_EPOCH).num_days()).ok())
        })
        .collect();
    Arc::new(days)
}
