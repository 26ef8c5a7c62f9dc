//! Console output utilities
//!
//! This module provides formatted console output for inspecting record
//! batches, such as written sequence partitions.

use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};

/// Print summary information about record batches
pub fn print_batch_summary(batches: &[RecordBatch], elapsed: std::time::Duration) {
    println!("Read {} record batches in {:?}", batches.len(), elapsed);
    println!(
        "Total rows: {}",
        batches.iter().map(RecordBatch::num_rows).sum::<usize>()
    );
}

/// Print detailed schema information from the first batch
pub fn print_schema_info(batch: &RecordBatch) {
    println!("Schema:");
    for field in batch.schema().fields() {
        println!("  - {} ({})", field.name(), field.data_type());
    }
}

/// Print one row, one column per line
pub fn print_row(batch: &RecordBatch, row: usize) -> Result<(), arrow::error::ArrowError> {
    if row >= batch.num_rows() {
        println!("Row {row} out of range ({} rows)", batch.num_rows());
        return Ok(());
    }

    let options = FormatOptions::default().with_null("NULL");
    println!("Row {row}:");
    for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
        let formatter = ArrayFormatter::try_new(column.as_ref(), &options)?;
        println!("  {}: {}", field.name(), formatter.value(row));
    }
    Ok(())
}
