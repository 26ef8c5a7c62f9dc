//! IO utilities for file operations
//!
//! This module provides utilities for working with the partitioned Parquet
//! layout: partition file naming, discovery, reading and writing.

pub mod parquet;
pub mod partition;

// Re-export commonly used functions for convenience
pub use parquet::{
    find_parquet_files, open_parquet_reader, read_parquet, read_parquet_dir, validate_directory,
    write_parquet,
};
pub use partition::{count_partitions, partition_file_name, partition_path};
