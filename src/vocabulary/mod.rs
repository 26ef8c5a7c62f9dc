//! Drug to ingredient mapping from the OMOP vocabulary tables.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, UInt64Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::Result;
use crate::schema::CdmTable;
use crate::schema::cdm::DRUG_CONCEPT_ID;
use crate::utils::arrow::{int64_column, string_column};
use crate::utils::io::read_parquet_dir;

pub const CONCEPT_TABLE: &str = "concept";
pub const CONCEPT_ANCESTOR_TABLE: &str = "concept_ancestor";

const CONCEPT_ID: &str = "concept_id";
const CONCEPT_CLASS_ID: &str = "concept_class_id";
const ANCESTOR_CONCEPT_ID: &str = "ancestor_concept_id";
const DESCENDANT_CONCEPT_ID: &str = "descendant_concept_id";
const INGREDIENT_CLASS: &str = "Ingredient";

type Ingredients = SmallVec<[i64; 2]>;

/// Immutable map from drug concept to its ingredient concepts
#[derive(Debug, Clone, Default)]
pub struct DrugIngredientMapping {
    ingredients: FxHashMap<i64, Ingredients>,
}

impl DrugIngredientMapping {
    /// Build the mapping from `<cdm_data_path>/concept` and
    /// `<cdm_data_path>/concept_ancestor`
    pub fn load(cdm_data_path: &Path) -> Result<Self> {
        let start = std::time::Instant::now();

        let concepts = read_parquet_dir(
            &cdm_data_path.join(CONCEPT_TABLE),
            Some(&[CONCEPT_ID, CONCEPT_CLASS_ID]),
        )?;
        let mut ingredient_ids = FxHashSet::default();
        for batch in &concepts {
            let ids = int64_column(batch, CONCEPT_TABLE, CONCEPT_ID)?;
            let classes = string_column(batch, CONCEPT_TABLE, CONCEPT_CLASS_ID)?;
            for row in 0..batch.num_rows() {
                if !ids.is_null(row) && classes.is_valid(row) && classes.value(row) == INGREDIENT_CLASS
                {
                    ingredient_ids.insert(ids.value(row));
                }
            }
        }

        let ancestors = read_parquet_dir(
            &cdm_data_path.join(CONCEPT_ANCESTOR_TABLE),
            Some(&[ANCESTOR_CONCEPT_ID, DESCENDANT_CONCEPT_ID]),
        )?;
        let mut pairs = Vec::new();
        for batch in &ancestors {
            let ancestor = int64_column(batch, CONCEPT_ANCESTOR_TABLE, ANCESTOR_CONCEPT_ID)?;
            let descendant = int64_column(batch, CONCEPT_ANCESTOR_TABLE, DESCENDANT_CONCEPT_ID)?;
            for row in 0..batch.num_rows() {
                if ancestor.is_null(row) || descendant.is_null(row) {
                    continue;
                }
                if ingredient_ids.contains(&ancestor.value(row)) {
                    pairs.push((descendant.value(row), ancestor.value(row)));
                }
            }
        }

        let mapping = Self::from_pairs(pairs);
        log::info!(
            "Loaded ingredient mapping for {} drug concepts ({} ingredients) in {:?}",
            mapping.len(),
            ingredient_ids.len(),
            start.elapsed()
        );
        Ok(mapping)
    }

    /// Build the mapping from `(drug, ingredient)` pairs, keeping pair order
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut ingredients: FxHashMap<i64, Ingredients> = FxHashMap::default();
        for (drug, ingredient) in pairs {
            ingredients.entry(drug).or_default().push(ingredient);
        }
        Self { ingredients }
    }

    /// Ingredients of a drug, empty when unmapped
    #[must_use]
    pub fn ingredients_of(&self, drug_concept_id: i64) -> &[i64] {
        self.ingredients
            .get(&drug_concept_id)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Number of mapped drug concepts
    #[must_use]
    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// Replace every drug row by one row per ingredient of its drug concept
    ///
    /// Rows of unmapped drugs and rows with a null drug concept are dropped.
    /// The `drug_concept_id` column of the result is Int64.
    pub fn remap_drug_exposure(&self, rows: &RecordBatch) -> Result<RecordBatch> {
        let table = CdmTable::DrugExposure.name();
        let drugs = int64_column(rows, table, DRUG_CONCEPT_ID)?;

        let mut take = Vec::with_capacity(rows.num_rows());
        let mut concepts = Vec::with_capacity(rows.num_rows());
        for row in 0..rows.num_rows() {
            if drugs.is_null(row) {
                continue;
            }
            for &ingredient in self.ingredients_of(drugs.value(row)) {
                take.push(row as u64);
                concepts.push(ingredient);
            }
        }

        let remapped = take_record_batch(rows, &UInt64Array::from(take))?;
        let column = remapped.schema().index_of(DRUG_CONCEPT_ID)?;

        let fields = remapped
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if i == column {
                    Arc::new(Field::new(DRUG_CONCEPT_ID, DataType::Int64, field.is_nullable()))
                } else {
                    field.clone()
                }
            })
            .collect::<Vec<_>>();
        let mut columns = remapped.columns().to_vec();
        columns[column] = Arc::new(Int64Array::from(concepts)) as ArrayRef;

        let schema = Schema::new_with_metadata(fields, remapped.schema().metadata().clone());
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }
}
