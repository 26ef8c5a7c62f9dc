//! Coercion of source columns to the canonical types used by the processor.
//!
//! Extraction tools write ids as any integer width and dates as Date32,
//! Date64, timestamps or ISO strings depending on the source database. The
//! processor works on Int64 ids and Date32 dates only.

pub mod conversions;
pub mod date_utils;

pub use conversions::{to_date32, to_int64};
pub use date_utils::{DateFormatConfig, parse_date_string};
