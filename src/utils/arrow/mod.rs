//! Arrow data handling utilities
//!
//! This module contains utilities for working with Arrow arrays and record
//! batches: column lookup with type coercion, typed column extraction and
//! conversion between Date32 day numbers and calendar dates.

pub mod array_utils;
pub mod conversion;
pub mod extractors;

// Re-export commonly used functions for convenience
pub use array_utils::{downcast_array, get_column};
pub use conversion::{date_to_days, days_to_date};
pub use extractors::{
    date32_column, extract_int64, int64_column, optional_date32_column, optional_int64_column,
    string_column,
};
