//! Utility functions shared by the readers, the merge-join and the processors

pub mod arrow;
pub mod io;
pub mod logging;

pub use io::parquet::DEFAULT_BATCH_SIZE;
