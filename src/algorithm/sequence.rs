//! Flattening of visit bundles into a CEHR-BERT token sequence.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{CdmError, Result};
use crate::models::{CdmTables, ObservationPeriod, SequenceRow, VisitBundle};
use crate::schema::cdm::{DAY_OF_BIRTH, MONTH_OF_BIRTH, YEAR_OF_BIRTH};
use crate::schema::{CdmTable, DEATH_CONCEPT_ID};
use crate::utils::arrow::conversion::UNIX_EPOCH;
use crate::utils::arrow::{date32_column, days_to_date, extract_int64, int64_column};

pub const VISIT_START_TOKEN: &str = "VS";
pub const VISIT_END_TOKEN: &str = "VE";

/// Average month length used for ages
const DAYS_PER_MONTH: f64 = 30.5;

/// A domain event reduced to what the sequence needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub concept_id: i64,
    pub date: NaiveDate,
}

/// Token describing the gap between two visits
///
/// Negative gaps (overlapping visits) map to `W-1`, gaps under four weeks to
/// whole weeks, gaps under 360 days to 30-day months and anything longer to
/// `LT`.
#[must_use]
pub fn interval_token(gap_days: i64) -> String {
    if gap_days < 0 {
        "W-1".to_string()
    } else if gap_days < 28 {
        format!("W{}", gap_days / 7)
    } else if gap_days < 360 {
        format!("M{}", gap_days / 30)
    } else {
        "LT".to_string()
    }
}

/// Whole weeks since 1970-01-01, rounded towards negative infinity
#[must_use]
pub fn weeks_since_epoch(date: NaiveDate) -> i32 {
    let days = (date - UNIX_EPOCH).num_days();
    i32::try_from(days.div_euclid(7)).unwrap_or(i32::MIN)
}

/// Age in 30.5-day months, rounded towards negative infinity
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn age_in_months(date: NaiveDate, date_of_birth: NaiveDate) -> i32 {
    let days = (date - date_of_birth).num_days();
    (days as f64 / DAYS_PER_MONTH).floor() as i32
}

/// Date of birth from a person row
///
/// `year_of_birth` is required; a missing or null month or day is taken as 1.
pub fn get_date_of_birth(person: &RecordBatch) -> Result<NaiveDate> {
    let table = CdmTable::Person.name();
    let year = extract_int64(person, table, 0, YEAR_OF_BIRTH, true)?.ok_or_else(|| {
        CdmError::InvalidValue(format!("Person row has a null {YEAR_OF_BIRTH}"))
    })?;
    let month = extract_int64(person, table, 0, MONTH_OF_BIRTH, false)?.unwrap_or(1);
    let day = extract_int64(person, table, 0, DAY_OF_BIRTH, false)?.unwrap_or(1);

    let invalid = || CdmError::InvalidValue(format!("Invalid date of birth {year}-{month}-{day}"));
    let (Ok(y), Ok(m), Ok(d)) = (i32::try_from(year), u32::try_from(month), u32::try_from(day))
    else {
        return Err(invalid());
    };
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)
}

/// All events of a table-set, sorted by date then concept id
///
/// Tables are read in domain order and the sort is stable. Deaths carry
/// [`DEATH_CONCEPT_ID`]; a null concept id is taken as 0 and rows without a
/// date are skipped.
pub fn union_domain_events(tables: &CdmTables) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for table in CdmTable::DOMAIN {
        let Some(rows) = tables.get(table) else {
            continue;
        };
        let Some(date_column) = table.start_date_column() else {
            continue;
        };
        let dates = date32_column(rows, table.name(), date_column)?;
        let concepts = table
            .concept_id_column()
            .map(|column| int64_column(rows, table.name(), column))
            .transpose()?;

        for row in 0..rows.num_rows() {
            if dates.is_null(row) {
                continue;
            }
            let concept_id = match &concepts {
                Some(concepts) if concepts.is_null(row) => 0,
                Some(concepts) => concepts.value(row),
                None => DEATH_CONCEPT_ID,
            };
            events.push(Event {
                concept_id,
                date: days_to_date(dates.value(row))?,
            });
        }
    }

    events.sort_by_key(|event| (event.date, event.concept_id));
    Ok(events)
}

struct Token {
    text: String,
    segment: i32,
    date: i32,
    age: i32,
    visit_order: i32,
    visit_concept_id: i64,
}

fn push_token(row: &mut SequenceRow, token: Token) {
    row.concept_ids.push(token.text);
    row.visit_segments.push(token.segment);
    row.dates.push(token.date);
    row.ages.push(token.age);
    row.visit_concept_orders.push(token.visit_order);
    row.visit_concept_ids.push(token.visit_concept_id);
}

/// Build the sequence row of one observation period
///
/// `bundles` must be ordered by visit start date. Each visit contributes
/// `VS`, its events and `VE`; consecutive visits are separated by an
/// interval token.
pub fn build_sequence(
    bundles: &[VisitBundle],
    period: &ObservationPeriod,
    date_of_birth: NaiveDate,
) -> Result<SequenceRow> {
    let mut row = SequenceRow {
        cohort_member_id: period.observation_period_id,
        person_id: period.person_id,
        concept_ids: Vec::new(),
        visit_segments: Vec::new(),
        orders: Vec::new(),
        dates: Vec::new(),
        ages: Vec::new(),
        visit_concept_orders: Vec::new(),
        num_of_visits: 0,
        num_of_concepts: 0,
        visit_concept_ids: Vec::new(),
    };

    let too_long =
        || CdmError::InvalidValue(format!("Sequence of person {} is too long", period.person_id));

    let mut previous_end: Option<NaiveDate> = None;
    for (index, bundle) in bundles.iter().enumerate() {
        let rank = i32::try_from(index + 1).map_err(|_| too_long())?;
        let visit = &bundle.visit;

        if let Some(previous_end) = previous_end {
            push_token(
                &mut row,
                Token {
                    text: interval_token((visit.start_date - previous_end).num_days()),
                    segment: 0,
                    date: 0,
                    age: -1,
                    visit_order: rank + 1,
                    visit_concept_id: 0,
                },
            );
        }

        let segment = rank % 2 + 1;
        let token = |text: String, date: NaiveDate| Token {
            text,
            segment,
            date: weeks_since_epoch(date),
            age: age_in_months(date, date_of_birth),
            visit_order: rank,
            visit_concept_id: visit.visit_concept_id,
        };

        push_token(&mut row, token(VISIT_START_TOKEN.to_string(), visit.start_date));
        for event in union_domain_events(&bundle.tables)? {
            push_token(&mut row, token(event.concept_id.to_string(), event.date));
        }
        push_token(&mut row, token(VISIT_END_TOKEN.to_string(), visit.end_date));

        previous_end = Some(visit.end_date);
    }

    row.num_of_visits = i32::try_from(bundles.len()).map_err(|_| too_long())?;
    row.num_of_concepts = i32::try_from(row.concept_ids.len()).map_err(|_| too_long())?;
    row.orders = (1..row.num_of_concepts).collect();
    Ok(row)
}
