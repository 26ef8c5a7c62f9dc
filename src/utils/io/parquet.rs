//! Parquet file operations
//!
//! This module provides utilities for reading and writing Parquet files.
//! It includes functions for finding Parquet files, opening lazy batch
//! readers with column projection, reading whole tables and writing record
//! batches.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use crate::error::{CdmError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("CDM_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&size| size > 0)
}

/// Validates that a directory exists and is a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(CdmError::Config(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(())
}

/// Helper for creating a projection mask from column names
///
/// Columns missing from the file are skipped with a warning. Returns `None`
/// when no requested column exists, in which case all columns are read.
#[must_use]
pub fn create_projection(
    columns: &[&str],
    file_schema: &SchemaRef,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection = columns
        .iter()
        .filter_map(|name| {
            file_schema.index_of(name).map_or_else(
                |_| {
                    log_warning(&format!("Field {name} not found in parquet file, skipping"), None);
                    None
                },
                Some,
            )
        })
        .collect_vec();

    if projection.is_empty() {
        log_warning(
            "No matching fields found in schema projection, reading all columns",
            None,
        );
        None
    } else {
        Some(ProjectionMask::roots(parquet_schema, projection))
    }
}

/// Open a lazy batch reader over a Parquet file
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `columns` - Optional column names to project
/// * `batch_size` - Rows per yielded batch
pub fn open_parquet_reader(
    path: &Path,
    columns: Option<&[&str]>,
    batch_size: usize,
) -> Result<ParquetRecordBatchReader> {
    let file = File::open(path).map_err(|e| {
        CdmError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file {}: {e}", path.display()),
        ))
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(batch_size);
    let builder = match columns.and_then(|columns| {
        create_projection(columns, builder.schema(), builder.parquet_schema())
    }) {
        Some(mask) => builder.with_projection(mask),
        None => builder,
    };

    Ok(builder.build()?)
}

/// Read a whole Parquet file into Arrow record batches
pub fn read_parquet(path: &Path, columns: Option<&[&str]>) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let batches = open_parquet_reader(path, columns, DEFAULT_BATCH_SIZE)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Find all Parquet files in a directory, sorted by file name
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);
    validate_directory(dir)?;

    let parquet_files = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    } else {
        log_operation_complete("found", dir, parquet_files.len(), None);
    }

    Ok(parquet_files)
}

/// Read every Parquet file of a directory dataset in parallel
pub fn read_parquet_dir(dir: &Path, columns: Option<&[&str]>) -> Result<Vec<RecordBatch>> {
    let parquet_files = find_parquet_files(dir)?;

    let batches = parquet_files
        .par_iter()
        .map(|path| read_parquet(path, columns))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect_vec();

    log::info!(
        "Successfully loaded {} batches from {} Parquet files",
        batches.len(),
        parquet_files.len()
    );
    Ok(batches)
}

/// Write record batches sharing one schema to a Parquet file
pub fn write_parquet(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<()> {
    let start = std::time::Instant::now();
    log_operation_start("Writing parquet file", path);

    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;

    log_operation_complete("wrote", path, batches.len(), Some(start.elapsed()));
    Ok(())
}
