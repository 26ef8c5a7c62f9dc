//! Algorithm implementations for CEHR-BERT sequencing
//!
//! This module contains the per-person pipeline that runs after the
//! merge-join: splitting a person's tables by observation period, grouping
//! events into visits and flattening the visits into a token sequence.

pub mod observation_period;
pub mod sequence;
pub mod visit;

pub use observation_period::{filter_to_period, for_each_observation_period};
pub use sequence::{build_sequence, get_date_of_birth, interval_token};
pub use visit::group_by_visit;
