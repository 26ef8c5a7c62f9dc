//! The CEHR-BERT output row

use std::sync::Arc;

use arrow::datatypes::{FieldRef, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::Result;

/// Token sequence of one person during one observation period
///
/// `concept_ids`, `visit_segments`, `dates`, `ages`, `visit_concept_orders`
/// and `visit_concept_ids` are parallel and `num_of_concepts` long.
/// `orders` enumerates `1..num_of_concepts` and is one element shorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRow {
    /// Observation period id
    pub cohort_member_id: i64,
    pub person_id: i64,
    /// Tokens: concept ids as text, visit markers and interval tokens
    pub concept_ids: Vec<String>,
    pub visit_segments: Vec<i32>,
    pub orders: Vec<i32>,
    /// Weeks since 1970-01-01
    pub dates: Vec<i32>,
    /// Months since birth
    pub ages: Vec<i32>,
    pub visit_concept_orders: Vec<i32>,
    pub num_of_visits: i32,
    pub num_of_concepts: i32,
    pub visit_concept_ids: Vec<i64>,
}

impl SequenceRow {
    /// Arrow fields of the row type
    pub fn fields() -> Result<Vec<FieldRef>> {
        let options = TracingOptions::default()
            .strings_as_large_utf8(false)
            .sequence_as_large_list(false);
        Ok(Vec::<FieldRef>::from_type::<Self>(options)?)
    }

    /// Arrow schema of the row type
    pub fn schema() -> Result<SchemaRef> {
        Ok(Arc::new(Schema::new(Self::fields()?)))
    }

    /// Convert rows to a record batch
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        Ok(serde_arrow::to_record_batch(&Self::fields()?, &rows)?)
    }

    /// Convert a record batch back to rows
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }
}
