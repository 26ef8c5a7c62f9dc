use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use tempfile::TempDir;

use cdm_sequencer::utils::arrow::date_to_days;
use cdm_sequencer::utils::io::{partition_file_name, read_parquet, write_parquet};
use cdm_sequencer::{CdmTable, SequenceRow};

#[must_use]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> RecordBatch {
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

fn ids(values: impl Iterator<Item = i64>) -> ArrayRef {
    Arc::new(Int64Array::from_iter_values(values))
}

fn dates(values: impl Iterator<Item = NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from_iter_values(values.map(date_to_days)))
}

/// `(person_id, year, month, day)`
pub fn person(rows: &[(i64, i32, Option<i32>, Option<i32>)]) -> RecordBatch {
    batch(
        vec![
            Field::new("person_id", DataType::Int64, false),
            Field::new("year_of_birth", DataType::Int32, true),
            Field::new("month_of_birth", DataType::Int32, true),
            Field::new("day_of_birth", DataType::Int32, true),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.1))),
            Arc::new(Int32Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
            Arc::new(Int32Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        ],
    )
}

/// `(observation_period_id, person_id, start, end)`
pub fn observation_period(rows: &[(i64, i64, NaiveDate, NaiveDate)]) -> RecordBatch {
    batch(
        vec![
            Field::new("observation_period_id", DataType::Int64, false),
            Field::new("person_id", DataType::Int64, false),
            Field::new("observation_period_start_date", DataType::Date32, false),
            Field::new("observation_period_end_date", DataType::Date32, false),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            ids(rows.iter().map(|r| r.1)),
            dates(rows.iter().map(|r| r.2)),
            dates(rows.iter().map(|r| r.3)),
        ],
    )
}

/// `(visit_occurrence_id, person_id, visit_concept_id, start, end)`
pub fn visit_occurrence(rows: &[(i64, i64, i64, NaiveDate, Option<NaiveDate>)]) -> RecordBatch {
    batch(
        vec![
            Field::new("visit_occurrence_id", DataType::Int64, false),
            Field::new("person_id", DataType::Int64, false),
            Field::new("visit_concept_id", DataType::Int64, false),
            Field::new("visit_start_date", DataType::Date32, false),
            Field::new("visit_end_date", DataType::Date32, true),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            ids(rows.iter().map(|r| r.1)),
            ids(rows.iter().map(|r| r.2)),
            dates(rows.iter().map(|r| r.3)),
            Arc::new(Date32Array::from(
                rows.iter().map(|r| r.4.map(date_to_days)).collect::<Vec<_>>(),
            )),
        ],
    )
}

/// `(person_id, condition_concept_id, start, visit_occurrence_id)`
pub fn condition_occurrence(rows: &[(i64, i64, NaiveDate, Option<i64>)]) -> RecordBatch {
    batch(
        vec![
            Field::new("person_id", DataType::Int64, false),
            Field::new("condition_concept_id", DataType::Int64, false),
            Field::new("condition_start_date", DataType::Date32, false),
            Field::new("visit_occurrence_id", DataType::Int64, true),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            ids(rows.iter().map(|r| r.1)),
            dates(rows.iter().map(|r| r.2)),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        ],
    )
}

/// `(person_id, drug_concept_id, start)`
pub fn drug_exposure(rows: &[(i64, i64, NaiveDate)]) -> RecordBatch {
    batch(
        vec![
            Field::new("person_id", DataType::Int64, false),
            Field::new("drug_concept_id", DataType::Int64, false),
            Field::new("drug_exposure_start_date", DataType::Date32, false),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            ids(rows.iter().map(|r| r.1)),
            dates(rows.iter().map(|r| r.2)),
        ],
    )
}

/// `(person_id, death_date)`
pub fn death(rows: &[(i64, NaiveDate)]) -> RecordBatch {
    batch(
        vec![
            Field::new("person_id", DataType::Int64, false),
            Field::new("death_date", DataType::Date32, false),
        ],
        vec![ids(rows.iter().map(|r| r.0)), dates(rows.iter().map(|r| r.1))],
    )
}

/// `(concept_id, concept_class_id)`
pub fn concept(rows: &[(i64, &str)]) -> RecordBatch {
    batch(
        vec![
            Field::new("concept_id", DataType::Int64, false),
            Field::new("concept_class_id", DataType::Utf8, false),
        ],
        vec![
            ids(rows.iter().map(|r| r.0)),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
        ],
    )
}

/// `(ancestor_concept_id, descendant_concept_id)`
pub fn concept_ancestor(rows: &[(i64, i64)]) -> RecordBatch {
    batch(
        vec![
            Field::new("ancestor_concept_id", DataType::Int64, false),
            Field::new("descendant_concept_id", DataType::Int64, false),
        ],
        vec![ids(rows.iter().map(|r| r.0)), ids(rows.iter().map(|r| r.1))],
    )
}

/// A CDM dataset in a temporary directory
pub struct CdmFixture {
    dir: TempDir,
}

impl CdmFixture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    #[must_use]
    pub fn cdm_path(&self) -> PathBuf {
        self.dir.path().join("cdm")
    }

    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("person_sequence")
    }

    /// Write the batches of one partition (0-based) of a table
    pub fn write(&self, table: CdmTable, partition: usize, batches: &[RecordBatch]) -> &Self {
        self.write_named(table.name(), &partition_file_name(partition), batches)
    }

    /// Write a file of an arbitrary table directory, e.g. the vocabulary
    pub fn write_named(&self, table: &str, file_name: &str, batches: &[RecordBatch]) -> &Self {
        let dir = self.cdm_path().join(table);
        std::fs::create_dir_all(&dir).unwrap();
        write_parquet(&dir.join(file_name), batches[0].schema(), batches).unwrap();
        self
    }

    /// Write a vocabulary mapping every drug in `pairs` to its ingredient
    pub fn write_vocabulary(&self, pairs: &[(i64, i64)]) -> &Self {
        let mut concepts = pairs
            .iter()
            .map(|&(_, ingredient)| (ingredient, "Ingredient"))
            .collect::<Vec<_>>();
        concepts.extend(pairs.iter().map(|&(drug, _)| (drug, "Clinical Drug")));
        let ancestors = pairs
            .iter()
            .map(|&(drug, ingredient)| (ingredient, drug))
            .collect::<Vec<_>>();

        self.write_named("concept", "part0001.parquet", &[concept(&concepts)]);
        self.write_named(
            "concept_ancestor",
            "part0001.parquet",
            &[concept_ancestor(&ancestors)],
        )
    }

    /// Sequences written for a 0-based partition, `None` if no file exists
    #[must_use]
    pub fn read_sequences(&self, partition: usize) -> Option<Vec<SequenceRow>> {
        let path = self.output_path().join(partition_file_name(partition));
        if !path.exists() {
            return None;
        }
        let rows = read_parquet(&path, None)
            .unwrap()
            .iter()
            .flat_map(|batch| SequenceRow::from_record_batch(batch).unwrap())
            .collect();
        Some(rows)
    }
}

/// Check the array-length and segment invariants of a sequence row
pub fn assert_well_formed(row: &SequenceRow) {
    let n = usize::try_from(row.num_of_concepts).unwrap();
    assert_eq!(row.concept_ids.len(), n);
    assert_eq!(row.visit_segments.len(), n);
    assert_eq!(row.dates.len(), n);
    assert_eq!(row.ages.len(), n);
    assert_eq!(row.visit_concept_orders.len(), n);
    assert_eq!(row.visit_concept_ids.len(), n);
    assert_eq!(row.orders, (1..row.num_of_concepts).collect::<Vec<_>>());

    let visit_starts = row.concept_ids.iter().filter(|t| *t == "VS").count();
    assert_eq!(visit_starts, usize::try_from(row.num_of_visits).unwrap());

    let mut visit_segment = None;
    for (token, &segment) in row.concept_ids.iter().zip(&row.visit_segments) {
        let is_interval = token == "LT" || token.starts_with('W') || token.starts_with('M');
        if is_interval {
            assert_eq!(segment, 0, "interval token {token} has segment {segment}");
            continue;
        }
        assert!(segment == 1 || segment == 2, "token {token} has segment {segment}");
        if token == "VS" {
            match visit_segment {
                Some(previous) => {
                    assert_ne!(segment, previous, "successive visits share segment {segment}");
                }
                None => assert_eq!(segment, 2, "first visit has segment {segment}"),
            }
            visit_segment = Some(segment);
        } else {
            assert_eq!(Some(segment), visit_segment, "token {token} left its visit segment");
        }
    }
}
