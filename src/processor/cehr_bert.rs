//! Processor producing CEHR-BERT sequences

use std::path::PathBuf;
use std::sync::Arc;

use crate::algorithm::{
    build_sequence, for_each_observation_period, get_date_of_birth, group_by_visit,
};
use crate::config::ProcessorConfig;
use crate::error::{CdmError, Result};
use crate::models::{PersonTables, SequenceRow};
use crate::processor::CdmProcessor;
use crate::schema::CdmTable;
use crate::utils::io::{partition_file_name, write_parquet};
use crate::vocabulary::DrugIngredientMapping;

/// Writes one sequence row per person and observation period
pub struct CehrBertProcessor {
    config: ProcessorConfig,
    mapping: Option<Arc<DrugIngredientMapping>>,
}

/// Rows of the partition being processed
#[derive(Debug, Default)]
pub struct CehrBertPartition {
    pub rows: Vec<SequenceRow>,
}

impl CehrBertProcessor {
    #[must_use]
    pub const fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            mapping: None,
        }
    }

    /// Use an already built mapping instead of loading it in `prepare`
    #[must_use]
    pub fn with_mapping(mut self, mapping: impl Into<Arc<DrugIngredientMapping>>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    fn mapping(&self) -> Result<&DrugIngredientMapping> {
        self.mapping
            .as_deref()
            .ok_or_else(|| CdmError::Config("Drug mapping not loaded, call prepare first".into()))
    }

    fn partition_output_path(&self, partition: usize) -> PathBuf {
        self.config.output_path.join(partition_file_name(partition))
    }

    /// Sequences of every observation period of one person
    pub fn person_sequences(&self, person: &PersonTables) -> Result<Vec<SequenceRow>> {
        let mapping = self.mapping()?;
        let person_rows = person.tables.get(CdmTable::Person).ok_or_else(|| {
            CdmError::malformed(CdmTable::Person.name(), "person_id", "has no row")
        })?;
        let date_of_birth = get_date_of_birth(person_rows)?;

        let mut rows = Vec::new();
        for_each_observation_period(&person.tables, |period, mut tables| {
            if let Some(drugs) = tables.remove(CdmTable::DrugExposure) {
                tables.insert(CdmTable::DrugExposure, mapping.remap_drug_exposure(&drugs)?);
            }
            let bundles = group_by_visit(&tables, &self.config.visit_grouping)?;
            rows.push(build_sequence(&bundles, period, date_of_birth)?);
            Ok(())
        })?;
        Ok(rows)
    }
}

impl CdmProcessor for CehrBertProcessor {
    type PartitionState = CehrBertPartition;

    fn prepare(&mut self) -> Result<()> {
        if self.mapping.is_none() {
            let mapping = DrugIngredientMapping::load(&self.config.cdm_data_path)?;
            self.mapping = Some(Arc::new(mapping));
        }
        Ok(())
    }

    fn prepare_partition(&self, partition: usize) -> Result<Self::PartitionState> {
        // Drop output of an earlier run
        let path = self.partition_output_path(partition);
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed previous output {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(CehrBertPartition::default())
    }

    fn process_person(
        &self,
        state: &mut Self::PartitionState,
        person: PersonTables,
    ) -> Result<()> {
        state.rows.extend(self.person_sequences(&person)?);
        Ok(())
    }

    fn finish_partition(&self, partition: usize, state: Self::PartitionState) -> Result<()> {
        if state.rows.is_empty() {
            log::debug!("Partition {partition} produced no sequences");
            return Ok(());
        }

        let batch = SequenceRow::to_record_batch(&state.rows)?;
        let path = self.partition_output_path(partition);
        write_parquet(&path, batch.schema(), &[batch])?;
        log::debug!(
            "Wrote {} sequences of partition {partition} to {}",
            state.rows.len(),
            path.display()
        );
        Ok(())
    }
}
