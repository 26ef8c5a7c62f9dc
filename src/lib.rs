//! A Rust library for turning OMOP CDM tables into CEHR-BERT token sequences.
//!
//! Partitioned, person-sorted Parquet tables are merge-joined per person,
//! split by observation period, grouped into visits and flattened into one
//! sequence row per person and period.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod filter;
pub mod merge;
pub mod models;
pub mod processor;
pub mod reader;
pub mod schema;
pub mod utils;
pub mod vocabulary;

// Re-export the most common types for easier use
// Core types
pub use config::{OrphanPolicy, ProcessorConfig, VisitGroupingOptions, VisitLinking};
pub use error::{CdmError, Result};
pub use models::{
    CdmTables, ObservationPeriod, PersonGroup, PersonTables, SequenceRow, Visit, VisitBundle,
};
pub use schema::CdmTable;

// Pipeline stages
pub use algorithm::{build_sequence, for_each_observation_period, group_by_visit};
pub use merge::{MergeStats, PartitionMergeJoin};
pub use reader::TableStreamReader;
pub use vocabulary::DrugIngredientMapping;

// Processing
pub use processor::{CdmProcessor, CehrBertProcessor, RunSummary, process_cdm_data};

// Arrow types
pub use arrow::record_batch::RecordBatch;
