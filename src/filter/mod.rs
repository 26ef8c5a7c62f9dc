//! Row filtering for Arrow record batches
//!
//! The segmenter restricts every dated table of a person to one observation
//! period with a [`DateRangeFilter`], built on the generic [`BatchFilter`]
//! trait and the mask-based [`filter_record_batch`].

pub mod core;
pub mod date;

pub use core::{BatchFilter, filter_record_batch};
pub use date::DateRangeFilter;
