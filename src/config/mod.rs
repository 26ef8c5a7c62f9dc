//! Configuration for CDM sequence processing.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CdmError;
use crate::utils::io::parquet::{DEFAULT_BATCH_SIZE, get_batch_size};

/// `max_cores` value that bypasses the worker pool and processes only the
/// first partition on the calling thread
pub const SINGLE_PARTITION_DEBUG: i32 = -1;

/// How events are linked to recorded visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitLinking {
    /// Only by matching `visit_occurrence_id`
    ById,
    /// Only by the event date falling within the visit's start and end dates
    ByDate,
    /// By id or, failing that, by date
    #[default]
    IdOrDate,
}

impl VisitLinking {
    #[must_use]
    pub const fn uses_id(self) -> bool {
        matches!(self, Self::ById | Self::IdOrDate)
    }

    #[must_use]
    pub const fn uses_date(self) -> bool {
        matches!(self, Self::ByDate | Self::IdOrDate)
    }
}

impl FromStr for VisitLinking {
    type Err = CdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(Self::ById),
            "date" => Ok(Self::ByDate),
            "id-or-date" | "both" => Ok(Self::IdOrDate),
            other => Err(CdmError::Config(format!(
                "Unknown visit linking mode '{other}' (expected id, date or id-or-date)"
            ))),
        }
    }
}

impl fmt::Display for VisitLinking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById => write!(f, "id"),
            Self::ByDate => write!(f, "date"),
            Self::IdOrDate => write!(f, "id-or-date"),
        }
    }
}

/// What to do with rows whose person id does not appear in the person table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Drop the rows and log a warning
    #[default]
    Skip,
    /// Fail the partition
    Fail,
}

impl FromStr for OrphanPolicy {
    type Err = CdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(CdmError::Config(format!(
                "Unknown orphan policy '{other}' (expected skip or fail)"
            ))),
        }
    }
}

/// Options for assigning events to visits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitGroupingOptions {
    /// How events are linked to recorded visits
    pub linking: VisitLinking,
    /// Create single-day visits for events that match no visit
    pub create_missing_visits: bool,
    /// Visit concept id given to created visits
    pub missing_visit_concept_id: i64,
}

impl Default for VisitGroupingOptions {
    fn default() -> Self {
        Self {
            linking: VisitLinking::IdOrDate,
            create_missing_visits: true,
            missing_visit_concept_id: 0,
        }
    }
}

/// Configuration for a processing run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Directory holding one sub-directory of partition files per CDM table
    pub cdm_data_path: PathBuf,
    /// Directory the output partitions are written to
    pub output_path: PathBuf,
    /// Maximum number of worker threads; 0 uses all CPUs and
    /// [`SINGLE_PARTITION_DEBUG`] processes only the first partition
    pub max_cores: i32,
    /// Visit assignment options
    pub visit_grouping: VisitGroupingOptions,
    /// Handling of rows for persons missing from the person table
    pub orphan_policy: OrphanPolicy,
    /// Rows per Parquet read batch
    pub batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            cdm_data_path: PathBuf::from("."),
            output_path: PathBuf::from("person_sequence"),
            max_cores: 0,
            visit_grouping: VisitGroupingOptions::default(),
            orphan_policy: OrphanPolicy::default(),
            batch_size: get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}

impl ProcessorConfig {
    /// Create a configuration for the given input and output directories
    #[must_use]
    pub fn new(cdm_data_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            cdm_data_path: cdm_data_path.into(),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_cores(mut self, max_cores: i32) -> Self {
        self.max_cores = max_cores;
        self
    }

    #[must_use]
    pub fn with_visit_linking(mut self, linking: VisitLinking) -> Self {
        self.visit_grouping.linking = linking;
        self
    }

    #[must_use]
    pub fn with_missing_visits(mut self, create: bool, concept_id: i64) -> Self {
        self.visit_grouping.create_missing_visits = create;
        self.visit_grouping.missing_visit_concept_id = concept_id;
        self
    }

    #[must_use]
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Whether the worker pool is bypassed
    #[must_use]
    pub const fn is_single_partition_debug(&self) -> bool {
        self.max_cores == SINGLE_PARTITION_DEBUG
    }

    /// Number of worker threads for the pool
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        match usize::try_from(self.max_cores) {
            Ok(0) | Err(_) => num_cpus::get(),
            Ok(n) => n,
        }
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_cores < SINGLE_PARTITION_DEBUG {
            return Err(CdmError::Config(format!(
                "max_cores must be -1, 0 or positive, got {}",
                self.max_cores
            )));
        }
        if self.batch_size == 0 {
            return Err(CdmError::Config("batch_size must be positive".to_string()));
        }
        Ok(())
    }
}
