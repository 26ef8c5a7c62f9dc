//! CDM table definitions and column type coercion.

pub mod adapt;
pub mod cdm;

pub use adapt::DateFormatConfig;
pub use cdm::{CdmTable, DEATH_CONCEPT_ID, PERSON_ID};
