//! Partition file naming
//!
//! Partition `i` (0-based) of every table is stored as
//! `<cdm_data_path>/<table>/part{i+1:04}.parquet`; output partitions use the
//! same file name inside the output directory.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::schema::CdmTable;
use crate::utils::io::parquet::find_parquet_files;

/// File name of a 0-based partition index
#[must_use]
pub fn partition_file_name(partition: usize) -> String {
    format!("part{:04}.parquet", partition + 1)
}

/// Path of a table's partition file
#[must_use]
pub fn partition_path(cdm_data_path: &Path, table: CdmTable, partition: usize) -> PathBuf {
    cdm_data_path
        .join(table.name())
        .join(partition_file_name(partition))
}

/// Number of partitions, taken from the person table directory
pub fn count_partitions(cdm_data_path: &Path) -> Result<usize> {
    let files = find_parquet_files(&cdm_data_path.join(CdmTable::Person.name()))?;
    log::info!("Found {} partitions", files.len());
    Ok(files.len())
}
