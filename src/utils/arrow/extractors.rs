//! Field extraction utilities for Arrow record batches
//!
//! This module provides high-level utilities for extracting typed columns and
//! single values from Arrow record batches with appropriate error handling and
//! type conversion.

use arrow::array::{Array, Date32Array, Int64Array, StringArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{CdmError, Result};
use crate::utils::arrow::array_utils::{downcast_array, get_column};

/// Extract a required column as Int64
pub fn int64_column(batch: &RecordBatch, table: &str, column_name: &str) -> Result<Int64Array> {
    optional_int64_column(batch, table, column_name)?
        .ok_or_else(|| CdmError::malformed(table, column_name, "not found"))
}

/// Extract a column as Int64, or `None` if the batch lacks it
pub fn optional_int64_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
) -> Result<Option<Int64Array>> {
    get_column(batch, table, column_name, &DataType::Int64, false)?
        .map(|array| downcast_array::<Int64Array>(&array, table, column_name))
        .transpose()
}

/// Extract a required column as Date32
pub fn date32_column(batch: &RecordBatch, table: &str, column_name: &str) -> Result<Date32Array> {
    optional_date32_column(batch, table, column_name)?
        .ok_or_else(|| CdmError::malformed(table, column_name, "not found"))
}

/// Extract a column as Date32, or `None` if the batch lacks it
pub fn optional_date32_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
) -> Result<Option<Date32Array>> {
    get_column(batch, table, column_name, &DataType::Date32, false)?
        .map(|array| downcast_array::<Date32Array>(&array, table, column_name))
        .transpose()
}

/// Extract a required string column, accepting Utf8, LargeUtf8 and
/// dictionary-encoded strings
pub fn string_column(batch: &RecordBatch, table: &str, column_name: &str) -> Result<StringArray> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        return Err(CdmError::malformed(table, column_name, "not found"));
    };
    let column = batch.column(idx);
    let strings = if column.data_type() == &DataType::Utf8 {
        column.clone()
    } else {
        cast::cast(column, &DataType::Utf8).map_err(|e| {
            CdmError::malformed(table, column_name, format!("is not a string column: {e}"))
        })?
    };
    downcast_array::<StringArray>(&strings, table, column_name)
}

/// Extract a single Int64 value from a record batch
///
/// # Returns
///
/// * `Ok(Some(i64))` - The extracted value
/// * `Ok(None)` - If the value is null, or the column is absent and not required
/// * `Err` - If the column is required and absent, or has an unusable type
pub fn extract_int64(
    batch: &RecordBatch,
    table: &str,
    row: usize,
    column_name: &str,
    required: bool,
) -> Result<Option<i64>> {
    let Some(array) = get_column(batch, table, column_name, &DataType::Int64, required)? else {
        return Ok(None);
    };
    let values = downcast_array::<Int64Array>(&array, table, column_name)?;

    if row < values.len() && !values.is_null(row) {
        return Ok(Some(values.value(row)));
    }
    Ok(None)
}
