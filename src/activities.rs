use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Datelike, Local, Months, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assessment::{DayAssessment, DayFlags};
use crate::factors::validate as validate_factor;
use crate::ledger::ActivitySource;
use crate::models::{ActivityWeight, FactorDefinition, WeightBands};
use crate::store::AssessmentStore;

/// What to assess: the month containing `reference_date`, narrowed by an
/// optional search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentRequest {
    pub reference_date: NaiveDate,
    pub search_term: String,
    pub today: NaiveDate,
}

impl AssessmentRequest {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            search_term: String::new(),
            today: Local::now().date_naive(),
        }
    }

    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.with_day(1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((start, end))
}

/// Number of padding cells before day one. Weekday ordinals run 1 (Sunday)
/// to 7 (Saturday); the grid subtracts two, so a Monday start has no padding
/// and a Sunday start yields none either.
pub fn blank_count(month_start: NaiveDate) -> usize {
    let ordinal = month_start.weekday().number_from_sunday() as i64;
    usize::try_from(ordinal - 2).unwrap_or(0)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday().number_from_sunday(), 1 | 7)
}

/// All day assessments for one month, padding first.
#[derive(Debug, Clone, Serialize)]
pub struct MonthAssessment {
    reference_date: NaiveDate,
    search_term: String,
    days: Vec<DayAssessment>,
    month_score: i64,
}

impl MonthAssessment {
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn days(&self) -> &[DayAssessment] {
        &self.days
    }

    pub fn month_score(&self) -> i64 {
        self.month_score
    }

    pub fn blank_days(&self) -> usize {
        self.days.iter().filter(|day| day.is_blank()).count()
    }

    pub fn real_days(&self) -> impl Iterator<Item = &DayAssessment> {
        self.days.iter().filter(|day| !day.is_blank())
    }

    pub fn selected_day(&self) -> Option<&DayAssessment> {
        self.real_days().find(|day| day.is_selected())
    }

    /// Number of real days per weight, lightest first.
    pub fn weight_distribution(&self) -> BTreeMap<ActivityWeight, usize> {
        let mut distribution = BTreeMap::new();
        for day in self.real_days() {
            *distribution.entry(day.weight()).or_insert(0) += 1;
        }
        distribution
    }

    /// Scored days, highest score first; ties keep calendar order.
    pub fn busiest_days(&self, limit: usize) -> Vec<&DayAssessment> {
        let mut days: Vec<&DayAssessment> = self.real_days().filter(|day| day.score() > 0).collect();
        days.sort_by(|a, b| b.score().cmp(&a.score()));
        days.truncate(limit);
        days
    }

    pub fn weekend_work(&self) -> Vec<&DayAssessment> {
        self.real_days()
            .filter(|day| day.is_weekend() && day.score() > 0)
            .collect()
    }
}

/// Month grid builder.
pub struct Activities;

impl Activities {
    /// Builds the grid for the request's month from an already loaded
    /// snapshot of factors, bands and activity.
    pub fn build(
        request: &AssessmentRequest,
        factors: &[FactorDefinition],
        bands: &WeightBands,
        source: &impl ActivitySource,
    ) -> MonthAssessment {
        let mut days = Vec::new();

        if let Some((start, end)) = month_bounds(request.reference_date) {
            let padding = blank_count(start);
            days.extend((0..padding).map(|_| DayAssessment::blank()));

            for day_number in 1..=end.day() {
                let Some(date) = NaiveDate::from_ymd_opt(start.year(), start.month(), day_number) else {
                    warn!(year = start.year(), month = start.month(), day_number, "skipping unrepresentable day");
                    continue;
                };

                let flags = DayFlags {
                    is_selected: day_number == request.reference_date.day(),
                    is_weekend: is_weekend(date),
                    is_today: date == request.today,
                };
                days.push(DayAssessment::new(factors, bands, date, day_number, flags, source));
            }

            debug!(%start, %end, padding, "month grid built");
        } else {
            warn!(reference_date = %request.reference_date, "could not resolve month bounds");
        }

        let month_score = days
            .iter()
            .map(DayAssessment::score)
            .fold(0, i64::saturating_add);

        MonthAssessment {
            reference_date: request.reference_date,
            search_term: request.search_term.clone(),
            days,
            month_score,
        }
    }
}

/// Loads the month's factors, bands and activity from `store` and builds
/// the grid against that snapshot.
pub async fn assess_month<S>(store: &S, request: &AssessmentRequest) -> anyhow::Result<MonthAssessment>
where
    S: AssessmentStore + ?Sized,
{
    let (start, end) = month_bounds(request.reference_date)
        .with_context(|| format!("no calendar month for {}", request.reference_date))?;

    let factors = store
        .load_factor_definitions()
        .await
        .context("failed to load factor definitions")?;
    for factor in &factors {
        validate_factor(factor)
            .with_context(|| format!("factor {} ({}) is misconfigured", factor.id, factor.describe()))?;
    }
    let bands = store
        .load_weight_bands()
        .await
        .context("failed to load weight bands")?;
    let ledger = store
        .load_ledger(start, end, &request.search_term)
        .await
        .context("failed to load activity ledger")?;

    let month = Activities::build(request, &factors, &bands, &ledger);

    info!(
        month = %start.format("%Y-%m"),
        factors = factors.len(),
        entries = ledger.len(),
        month_score = month.month_score(),
        "month assessed"
    );

    Ok(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors;
    use crate::ledger::ActivityLedger;
    use crate::models::{ActionKind, ActivityEntry, EntityType};
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn default_factors() -> Vec<FactorDefinition> {
        vec![
            FactorDefinition::new(EntityType::Records, ActionKind::Create, 1, 0),
            FactorDefinition::new(EntityType::Jobs, ActionKind::Create, 2, 3),
        ]
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        assert_eq!(month_bounds(date(2024, 2, 17)), Some((date(2024, 2, 1), date(2024, 2, 29))));
        assert_eq!(month_bounds(date(2026, 2, 3)), Some((date(2026, 2, 1), date(2026, 2, 28))));
        assert_eq!(month_bounds(date(2026, 12, 31)), Some((date(2026, 12, 1), date(2026, 12, 31))));
    }

    // The grid subtracts two from the Sunday-first ordinal; a month starting
    // on Sunday therefore gets no padding at all.
    #[test]
    fn blank_count_keeps_minus_two_offset() {
        assert_eq!(blank_count(date(2026, 6, 1)), 0); // Monday
        assert_eq!(blank_count(date(2026, 4, 1)), 2); // Wednesday
        assert_eq!(blank_count(date(2026, 8, 1)), 5); // Saturday
        assert_eq!(blank_count(date(2026, 3, 1)), 0); // Sunday
    }

    #[test]
    fn grid_has_padding_plus_every_day() {
        for reference in [date(2026, 2, 10), date(2026, 4, 30), date(2026, 8, 15), date(2024, 2, 29)] {
            let (start, end) = month_bounds(reference).unwrap();
            let month = Activities::build(
                &AssessmentRequest::new(reference),
                &default_factors(),
                &WeightBands::standard(),
                &ActivityLedger::default(),
            );
            assert_eq!(month.days().len(), blank_count(start) + end.day() as usize);
            assert_eq!(month.blank_days(), blank_count(start));
            assert!(month.days()[..blank_count(start)].iter().all(DayAssessment::is_blank));
            let numbers: Vec<u32> = month.real_days().map(DayAssessment::day_number).collect();
            assert_eq!(numbers, (1..=end.day()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn month_score_sums_daily_scores() {
        let reference = date(2026, 4, 14);
        let ledger = ActivityLedger::new(vec![
            ActivityEntry::new(EntityType::Records, date(2026, 4, 1), "kickoff"),
            ActivityEntry::new(EntityType::Records, date(2026, 4, 1), "planning"),
            ActivityEntry::new(EntityType::Jobs, date(2026, 4, 1), "new job"),
            ActivityEntry::new(EntityType::Jobs, date(2026, 4, 1), "another job"),
            ActivityEntry::new(EntityType::Records, date(2026, 4, 18), "weekend fix"),
        ]);

        let month = Activities::build(
            &AssessmentRequest::new(reference),
            &default_factors(),
            &WeightBands::standard(),
            &ledger,
        );

        let total: i64 = month.real_days().map(DayAssessment::score).sum();
        assert_eq!(month.month_score(), total);
        assert_eq!(month.month_score(), 2 + 4 + 1);
    }

    #[test]
    fn flags_follow_calendar_and_request() {
        let reference = date(2026, 8, 12);
        let request = AssessmentRequest::new(reference).with_today(date(2026, 8, 3));
        let month = Activities::build(&request, &default_factors(), &WeightBands::standard(), &ActivityLedger::default());

        let day = |n: u32| month.real_days().find(|d| d.day_number() == n).unwrap();
        assert!(day(1).is_weekend()); // Saturday
        assert!(day(2).is_weekend()); // Sunday
        assert!(!day(3).is_weekend());
        assert!(day(3).is_today());
        assert!(day(12).is_selected());
        assert_eq!(month.selected_day().map(DayAssessment::day_number), Some(12));
        assert_eq!(month.real_days().filter(|d| d.is_selected()).count(), 1);
    }

    #[test]
    fn summaries_rank_days_and_spot_weekend_work() {
        let ledger = ActivityLedger::new(vec![
            ActivityEntry::new(EntityType::Records, date(2026, 8, 1), "saturday deploy"),
            ActivityEntry::new(EntityType::Records, date(2026, 8, 4), "a"),
            ActivityEntry::new(EntityType::Records, date(2026, 8, 4), "b"),
            ActivityEntry::new(EntityType::Records, date(2026, 8, 5), "c"),
        ]);
        let month = Activities::build(
            &AssessmentRequest::new(date(2026, 8, 20)),
            &default_factors(),
            &WeightBands::standard(),
            &ledger,
        );

        let busiest: Vec<u32> = month.busiest_days(2).iter().map(|d| d.day_number()).collect();
        assert_eq!(busiest, vec![4, 1]);
        let weekend: Vec<u32> = month.weekend_work().iter().map(|d| d.day_number()).collect();
        assert_eq!(weekend, vec![1]);
        assert_eq!(month.weight_distribution().get(&ActivityWeight::Light), Some(&3));
    }

    #[tokio::test]
    async fn assess_month_reads_store_and_sees_factor_changes() {
        let factors = default_factors();
        let records_id = factors[0].id;
        let ledger = ActivityLedger::new(vec![
            ActivityEntry::new(EntityType::Records, date(2026, 5, 6), "ticket triage"),
            ActivityEntry::new(EntityType::Records, date(2026, 5, 6), "release"),
            ActivityEntry::new(EntityType::Records, date(2026, 6, 1), "next month"),
        ]);
        let store = MemoryStore::new(factors, WeightBands::standard(), ledger);
        let request = AssessmentRequest::new(date(2026, 5, 6));

        let before = assess_month(&store, &request).await.unwrap();
        assert_eq!(before.month_score(), 2);

        let update = factors::set_weight(&store, records_id, 5).await.unwrap();
        assert!(update.requires_reassessment());
        assert_eq!(before.month_score(), 2);

        let after = assess_month(&store, &request).await.unwrap();
        assert_eq!(after.month_score(), 10);

        let narrowed = assess_month(&store, &request.clone().with_search_term("release")).await.unwrap();
        assert_eq!(narrowed.month_score(), 5);
        assert_eq!(narrowed.search_term(), "release");
    }

    #[tokio::test]
    async fn assess_month_rejects_negative_factor_values() {
        let mut factors = default_factors();
        factors[1].threshold = -4;
        let store = MemoryStore::new(factors, WeightBands::standard(), ActivityLedger::default());

        let err = assess_month(&store, &AssessmentRequest::new(date(2026, 5, 6)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("jobs create"));
        assert!(matches!(
            err.downcast_ref::<factors::FactorError>(),
            Some(factors::FactorError::NegativeThreshold(-4))
        ));
    }

    #[test]
    fn month_score_saturates() {
        let heavy = FactorDefinition::new(EntityType::Records, ActionKind::Create, i64::MAX, 0);
        let reference = date(2026, 5, 6);
        let ledger = ActivityLedger::new(vec![
            ActivityEntry::new(EntityType::Records, date(2026, 5, 4), "one"),
            ActivityEntry::new(EntityType::Records, date(2026, 5, 5), "two"),
        ]);
        let month = Activities::build(&AssessmentRequest::new(reference), &[heavy], &WeightBands::standard(), &ledger);
        assert_eq!(month.month_score(), i64::MAX);
        assert_eq!(month.weight_distribution().get(&ActivityWeight::Significant), Some(&2));
    }
}
