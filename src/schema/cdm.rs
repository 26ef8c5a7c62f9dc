//! OMOP CDM table definitions.
//!
//! Every table the processor reads is described by a [`CdmTable`] variant,
//! which knows its directory name, the column holding the event start date
//! and the column holding the event concept id.

use std::fmt;

/// Column linking every row to its person
pub const PERSON_ID: &str = "person_id";
/// Column linking events to a recorded visit
pub const VISIT_OCCURRENCE_ID: &str = "visit_occurrence_id";
pub const VISIT_START_DATE: &str = "visit_start_date";
pub const VISIT_END_DATE: &str = "visit_end_date";
pub const VISIT_CONCEPT_ID: &str = "visit_concept_id";
pub const OBSERVATION_PERIOD_ID: &str = "observation_period_id";
pub const OBSERVATION_PERIOD_START_DATE: &str = "observation_period_start_date";
pub const OBSERVATION_PERIOD_END_DATE: &str = "observation_period_end_date";
pub const YEAR_OF_BIRTH: &str = "year_of_birth";
pub const MONTH_OF_BIRTH: &str = "month_of_birth";
pub const DAY_OF_BIRTH: &str = "day_of_birth";
pub const DRUG_CONCEPT_ID: &str = "drug_concept_id";

/// Concept id assigned to death records, which carry no concept of their own
pub const DEATH_CONCEPT_ID: i64 = 4_306_655;

/// A table of the OMOP Common Data Model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CdmTable {
    Person,
    ObservationPeriod,
    VisitOccurrence,
    ConditionOccurrence,
    DrugExposure,
    ProcedureOccurrence,
    DeviceExposure,
    Measurement,
    Observation,
    Death,
}

impl CdmTable {
    /// Tables joined to the person table, in the order they are opened
    pub const JOINED: [Self; 9] = [
        Self::ObservationPeriod,
        Self::VisitOccurrence,
        Self::ConditionOccurrence,
        Self::DrugExposure,
        Self::ProcedureOccurrence,
        Self::DeviceExposure,
        Self::Measurement,
        Self::Observation,
        Self::Death,
    ];

    /// Clinical event tables, in the order their events are united
    pub const DOMAIN: [Self; 7] = [
        Self::ConditionOccurrence,
        Self::DrugExposure,
        Self::ProcedureOccurrence,
        Self::DeviceExposure,
        Self::Measurement,
        Self::Observation,
        Self::Death,
    ];

    /// Directory name of the table
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::ObservationPeriod => "observation_period",
            Self::VisitOccurrence => "visit_occurrence",
            Self::ConditionOccurrence => "condition_occurrence",
            Self::DrugExposure => "drug_exposure",
            Self::ProcedureOccurrence => "procedure_occurrence",
            Self::DeviceExposure => "device_exposure",
            Self::Measurement => "measurement",
            Self::Observation => "observation",
            Self::Death => "death",
        }
    }

    /// Column holding the date a row starts on, if the table is dated
    #[must_use]
    pub const fn start_date_column(self) -> Option<&'static str> {
        match self {
            Self::Person => None,
            Self::ObservationPeriod => Some(OBSERVATION_PERIOD_START_DATE),
            Self::VisitOccurrence => Some(VISIT_START_DATE),
            Self::ConditionOccurrence => Some("condition_start_date"),
            Self::DrugExposure => Some("drug_exposure_start_date"),
            Self::ProcedureOccurrence => Some("procedure_date"),
            Self::DeviceExposure => Some("device_exposure_start_date"),
            Self::Measurement => Some("measurement_date"),
            Self::Observation => Some("observation_date"),
            Self::Death => Some("death_date"),
        }
    }

    /// Column holding the event concept id, for domain tables that have one
    #[must_use]
    pub const fn concept_id_column(self) -> Option<&'static str> {
        match self {
            Self::ConditionOccurrence => Some("condition_concept_id"),
            Self::DrugExposure => Some(DRUG_CONCEPT_ID),
            Self::ProcedureOccurrence => Some("procedure_concept_id"),
            Self::DeviceExposure => Some("device_concept_id"),
            Self::Measurement => Some("measurement_concept_id"),
            Self::Observation => Some("observation_concept_id"),
            _ => None,
        }
    }

    /// Whether rows of this table become tokens
    #[must_use]
    pub fn is_domain(self) -> bool {
        Self::DOMAIN.contains(&self)
    }
}

impl fmt::Display for CdmTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
