use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cdm_sequencer::algorithm::sequence::{age_in_months, weeks_since_epoch};
use cdm_sequencer::processor::SUMMARY_FILE_NAME;
use cdm_sequencer::{
    CdmTable, CehrBertProcessor, DrugIngredientMapping, OrphanPolicy, ProcessorConfig,
    RunSummary, process_cdm_data,
};

use crate::utils::{
    CdmFixture, assert_well_formed, condition_occurrence, date, death, drug_exposure,
    observation_period, person, visit_occurrence,
};

fn run(config: ProcessorConfig) -> RunSummary {
    let mut processor = CehrBertProcessor::new(config.clone());
    process_cdm_data(&mut processor, &config).unwrap()
}

fn config(fixture: &CdmFixture) -> ProcessorConfig {
    ProcessorConfig::new(fixture.cdm_path(), fixture.output_path()).with_max_cores(2)
}

#[test]
fn test_recorded_and_synthetic_visits() {
    let fixture = CdmFixture::new();
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, None, None)])])
        .write(
            CdmTable::ObservationPeriod,
            0,
            &[observation_period(&[(10, 1, date(2020, 1, 1), date(2020, 12, 31))])],
        )
        .write(
            CdmTable::VisitOccurrence,
            0,
            &[visit_occurrence(&[(100, 1, 9202, date(2020, 1, 1), Some(date(2020, 1, 1)))])],
        )
        .write(
            CdmTable::ConditionOccurrence,
            0,
            &[condition_occurrence(&[
                (1, 201_826, date(2020, 1, 1), Some(100)),
                (1, 320_128, date(2020, 2, 20), None),
                (1, 999, date(2021, 6, 1), None),
            ])],
        )
        .write(
            CdmTable::DrugExposure,
            0,
            &[drug_exposure(&[
                (1, 1001, date(2020, 2, 20)),
                (1, 1002, date(2020, 2, 20)),
            ])],
        )
        .write_vocabulary(&[(1001, 2001)]);

    let summary = run(config(&fixture));
    assert!(summary.is_success());
    assert!(fixture.output_path().join(SUMMARY_FILE_NAME).exists());

    let rows = fixture.read_sequences(0).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_well_formed(row);

    assert_eq!(row.cohort_member_id, 10);
    assert_eq!(row.person_id, 1);
    assert_eq!(
        row.concept_ids,
        vec!["VS", "201826", "VE", "M1", "VS", "2001", "320128", "VE"]
    );
    assert_eq!(row.visit_segments, vec![2, 2, 2, 0, 1, 1, 1, 1]);
    assert_eq!(row.visit_concept_orders, vec![1, 1, 1, 3, 2, 2, 2, 2]);
    assert_eq!(row.visit_concept_ids, vec![9202, 9202, 9202, 0, 0, 0, 0, 0]);
    assert_eq!(row.num_of_visits, 2);
    assert_eq!(row.num_of_concepts, 8);

    let birth = date(1980, 1, 1);
    assert_eq!(row.dates[0], weeks_since_epoch(date(2020, 1, 1)));
    assert_eq!(row.dates[3], 0);
    assert_eq!(row.dates[5], weeks_since_epoch(date(2020, 2, 20)));
    assert_eq!(row.ages[0], age_in_months(date(2020, 1, 1), birth));
    assert_eq!(row.ages[3], -1);
    assert_eq!(row.ages[7], age_in_months(date(2020, 2, 20), birth));
}

#[test]
fn test_empty_period_without_synthesis() {
    let fixture = CdmFixture::new();
    fixture
        .write(CdmTable::Person, 0, &[person(&[(2, 1970, Some(3), Some(4))])])
        .write(
            CdmTable::ObservationPeriod,
            0,
            &[observation_period(&[(20, 2, date(2019, 1, 1), date(2019, 6, 30))])],
        )
        .write_vocabulary(&[]);

    run(config(&fixture).with_missing_visits(false, 0));

    let rows = fixture.read_sequences(0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_well_formed(&rows[0]);
    assert!(rows[0].concept_ids.is_empty());
    assert_eq!(rows[0].num_of_visits, 0);
}

#[test]
fn test_person_without_period_writes_no_file() {
    let fixture = CdmFixture::new();
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, None, None)])])
        .write(
            CdmTable::ConditionOccurrence,
            0,
            &[condition_occurrence(&[(1, 5, date(2020, 1, 1), None)])],
        )
        .write_vocabulary(&[]);

    let summary = run(config(&fixture));
    assert!(summary.is_success());
    assert_eq!(summary.persons(), 1);
    assert!(fixture.read_sequences(0).is_none());
}

#[test]
fn test_rerun_replaces_previous_output() {
    let fixture = CdmFixture::new();
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, None, None)])])
        .write(
            CdmTable::ObservationPeriod,
            0,
            &[observation_period(&[(10, 1, date(2020, 1, 1), date(2020, 12, 31))])],
        )
        .write(
            CdmTable::DrugExposure,
            0,
            &[drug_exposure(&[(1, 1001, date(2020, 3, 1))])],
        );
    let with_mapping = |config: &ProcessorConfig| {
        CehrBertProcessor::new(config.clone())
            .with_mapping(DrugIngredientMapping::from_pairs([(1001, 2001)]))
    };

    // No vocabulary on disk, the mapping is supplied directly
    let config = config(&fixture);
    let summary = process_cdm_data(&mut with_mapping(&config), &config).unwrap();
    assert!(summary.is_success());
    let rows = fixture.read_sequences(0).unwrap();
    assert_eq!(rows[0].concept_ids, vec!["VS", "2001", "VE"]);

    // The same partition no longer produces rows
    fixture.write(
        CdmTable::ObservationPeriod,
        0,
        &[observation_period(&[(10, 1, date(2019, 1, 1), date(2019, 12, 31))])],
    );
    let config = config.with_missing_visits(false, 0);
    let summary = process_cdm_data(&mut with_mapping(&config), &config).unwrap();
    assert!(summary.is_success());
    let rows = fixture.read_sequences(0).unwrap();
    assert!(rows[0].concept_ids.is_empty());

    // No observation period at all, so nothing is written
    std::fs::remove_dir_all(fixture.cdm_path().join(CdmTable::ObservationPeriod.name())).unwrap();
    let summary = process_cdm_data(&mut with_mapping(&config), &config).unwrap();
    assert!(summary.is_success());
    assert!(fixture.read_sequences(0).is_none());
}

fn orphan_fixture() -> CdmFixture {
    let fixture = CdmFixture::new();
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, None, None)])])
        .write(
            CdmTable::ObservationPeriod,
            0,
            &[observation_period(&[(10, 1, date(2020, 1, 1), date(2020, 12, 31))])],
        )
        .write(
            CdmTable::ConditionOccurrence,
            0,
            &[condition_occurrence(&[
                (1, 5, date(2020, 1, 1), None),
                (7, 6, date(2020, 1, 1), None),
            ])],
        )
        .write_vocabulary(&[]);
    fixture
}

#[test]
fn test_orphans_skipped() {
    let fixture = orphan_fixture();
    let summary = run(config(&fixture));

    assert!(summary.is_success());
    assert_eq!(summary.partitions[0].orphan_rows, 1);
    let rows = fixture.read_sequences(0).unwrap();
    assert_eq!(rows[0].concept_ids, vec!["VS", "5", "VE"]);
}

#[test]
fn test_orphans_fail_partition() {
    let fixture = orphan_fixture();
    let summary = run(config(&fixture).with_orphan_policy(OrphanPolicy::Fail));

    assert!(!summary.is_success());
    let message = summary.partitions[0].error.as_deref().unwrap();
    assert!(message.starts_with("Partition 0"), "{message}");
    assert!(fixture.read_sequences(0).is_none());
}

#[test]
fn test_failure_isolated_to_partition() {
    let fixture = CdmFixture::new();
    let period = |id: i64, person_id: i64| (id, person_id, date(2020, 1, 1), date(2020, 12, 31));
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, Some(2), Some(30))])])
        .write(CdmTable::Person, 1, &[person(&[(2, 1980, None, None)])])
        .write(CdmTable::ObservationPeriod, 0, &[observation_period(&[period(10, 1)])])
        .write(CdmTable::ObservationPeriod, 1, &[observation_period(&[period(20, 2)])])
        .write_vocabulary(&[]);

    let summary = run(config(&fixture));

    assert_eq!(summary.partitions.len(), 2);
    let failed = summary.failures().collect::<Vec<_>>();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].partition, 0);
    assert!(
        failed[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Partition 0 (person 1)")
    );
    assert!(fixture.read_sequences(0).is_none());
    assert_eq!(fixture.read_sequences(1).unwrap().len(), 1);
}

#[test]
fn test_debug_mode_processes_first_partition() {
    let fixture = CdmFixture::new();
    let period = |id: i64, person_id: i64| (id, person_id, date(2020, 1, 1), date(2020, 12, 31));
    fixture
        .write(CdmTable::Person, 0, &[person(&[(1, 1980, None, None)])])
        .write(CdmTable::Person, 1, &[person(&[(2, 1980, None, None)])])
        .write(CdmTable::ObservationPeriod, 0, &[observation_period(&[period(10, 1)])])
        .write(CdmTable::ObservationPeriod, 1, &[observation_period(&[period(20, 2)])])
        .write_vocabulary(&[]);

    let summary = run(config(&fixture).with_max_cores(-1));

    assert_eq!(summary.partitions.len(), 1);
    assert!(fixture.read_sequences(0).is_some());
    assert!(fixture.read_sequences(1).is_none());
}

fn random_date(rng: &mut StdRng, from: NaiveDate, days: i64) -> NaiveDate {
    from + Duration::days(rng.random_range(0..days))
}

/// Write a seeded random dataset of `persons` persons over two partitions
fn random_fixture(seed: u64, persons: i64) -> CdmFixture {
    let mut rng = StdRng::seed_from_u64(seed);
    let origin = date(2014, 1, 1);
    let fixture = CdmFixture::new();

    for partition in 0..2_usize {
        let mut person_rows = Vec::new();
        let mut periods = Vec::new();
        let mut visits = Vec::new();
        let mut conditions = Vec::new();
        let mut drugs = Vec::new();
        let mut deaths = Vec::new();

        let first = 1 + i64::try_from(partition).unwrap() * persons;
        for person_id in first..first + persons {
            let month = rng.random_bool(0.7).then(|| rng.random_range(1..=12));
            person_rows.push((person_id, rng.random_range(1940..2000), month, None));

            for k in 0..rng.random_range(1..3_i64) {
                let start = random_date(&mut rng, origin, 1500);
                let end = start + Duration::days(rng.random_range(0..900));
                periods.push((person_id * 10 + k, person_id, start, end));
            }

            let mut visit_ids = Vec::new();
            for k in 0..rng.random_range(0..4_i64) {
                let start = random_date(&mut rng, origin, 2500);
                let end = rng
                    .random_bool(0.8)
                    .then(|| start + Duration::days(rng.random_range(0..5)));
                let id = person_id * 100 + k;
                visit_ids.push(id);
                visits.push((id, person_id, 9201 + k % 2, start, end));
            }

            for _ in 0..rng.random_range(0..8) {
                let visit = if visit_ids.is_empty() || rng.random_bool(0.3) {
                    None
                } else {
                    Some(visit_ids[rng.random_range(0..visit_ids.len())])
                };
                let concept = rng.random_range(100..110);
                conditions.push((person_id, concept, random_date(&mut rng, origin, 2500), visit));
            }

            for _ in 0..rng.random_range(0..5) {
                let concept = rng.random_range(1001..1006);
                drugs.push((person_id, concept, random_date(&mut rng, origin, 2500)));
            }

            if rng.random_bool(0.2) {
                deaths.push((person_id, random_date(&mut rng, origin, 2500)));
            }
        }

        fixture
            .write(CdmTable::Person, partition, &[person(&person_rows)])
            .write(CdmTable::ObservationPeriod, partition, &[observation_period(&periods)])
            .write(CdmTable::VisitOccurrence, partition, &[visit_occurrence(&visits)])
            .write(CdmTable::ConditionOccurrence, partition, &[condition_occurrence(&conditions)])
            .write(CdmTable::DrugExposure, partition, &[drug_exposure(&drugs)])
            .write(CdmTable::Death, partition, &[death(&deaths)]);
    }

    fixture.write_vocabulary(&[(1001, 2001), (1001, 2002), (1002, 2002), (1003, 2003)]);
    fixture
}

#[test]
fn test_random_dataset_invariants_and_determinism() {
    let fixture = random_fixture(42, 15);
    let config = config(&fixture).with_batch_size(4);

    let summary = run(config.clone());
    assert!(summary.is_success());
    assert_eq!(summary.persons(), 30);

    let first = (0..2)
        .map(|p| fixture.read_sequences(p).unwrap_or_default())
        .collect::<Vec<_>>();
    for rows in &first {
        for row in rows {
            assert_well_formed(row);
            // Unmapped drugs never appear
            for unmapped in ["1004", "1005", "1001"] {
                assert!(!row.concept_ids.iter().any(|t| t == unmapped));
            }
        }
        let persons = rows.iter().map(|r| r.person_id).collect::<Vec<_>>();
        assert!(persons.windows(2).all(|w| w[0] <= w[1]));
    }

    run(config);
    let second = (0..2)
        .map(|p| fixture.read_sequences(p).unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(first, second);
}
