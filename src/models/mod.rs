//! Data model of the processor
//!
//! Table-sets scoped to a person, an observation period or a visit, the
//! visit and observation-period records extracted from them, and the output
//! sequence row.

pub mod period;
pub mod sequence;
pub mod tables;
pub mod visit;

pub use period::ObservationPeriod;
pub use sequence::SequenceRow;
pub use tables::{CdmTables, PersonGroup, PersonTables};
pub use visit::{Visit, VisitBundle};
