//! Utilities for working with Arrow arrays.
//!
//! This module provides utility functions for safely looking up and
//! downcasting columns of a record batch, coercing ids and dates to the
//! canonical types on the way.

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{CdmError, Result};
use crate::schema::adapt::{DateFormatConfig, to_date32, to_int64};

/// Get a column from a record batch, converted to `expected_type`
///
/// Only `Int64` and `Date32` targets are coerced; any other target must
/// match the stored type exactly.
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column array (converted if necessary) if found
/// * `Ok(None)` - If the column is not found and `required` is false
/// * `Err` - If the column is not found and `required` is true, or if the
///   column type cannot be converted
pub fn get_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        if required {
            return Err(CdmError::malformed(table, column_name, "not found"));
        }
        return Ok(None);
    };

    let column = batch.column(idx);
    if column.data_type() == expected_type {
        return Ok(Some(column.clone()));
    }

    let converted = match expected_type {
        DataType::Int64 => to_int64(column, table, column_name)?,
        DataType::Date32 => to_date32(column, table, column_name, &DateFormatConfig::default())?,
        other => {
            return Err(CdmError::malformed(
                table,
                column_name,
                format!("has type {:?}, expected {other:?}", column.data_type()),
            ));
        }
    };
    log::trace!(
        "Converted column '{table}.{column_name}' from {:?} to {expected_type:?}",
        column.data_type()
    );

    Ok(Some(converted))
}

/// Downcast a column to a specific array type with clear error messages
pub fn downcast_array<A: Array + Clone + 'static>(
    array: &ArrayRef,
    table: &str,
    column_name: &str,
) -> Result<A> {
    array.as_any().downcast_ref::<A>().cloned().ok_or_else(|| {
        CdmError::malformed(
            table,
            column_name,
            format!("has unexpected array type {:?}", array.data_type()),
        )
    })
}
