use chrono::NaiveDate;
use serde::Serialize;
use tracing::{trace, warn};

use crate::factors::{self, FactorChange, FactorError, FactorUpdate};
use crate::ledger::{self, ActivitySource};
use crate::models::{ActivityWeight, EntityType, FactorDefinition, WeightBands};
use crate::store::AssessmentStore;

/// One factor definition annotated with its count for the assessed date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactorResult {
    pub definition: FactorDefinition,
    pub count: i64,
}

impl FactorResult {
    /// Count times weight, pinned at `i64::MAX` instead of overflowing.
    pub fn weighted(&self) -> i64 {
        self.count.saturating_mul(self.definition.weight)
    }

    /// Amount this factor adds to the day score. Never negative.
    pub fn contribution(&self) -> i64 {
        let weighted = self.weighted();
        if self.definition.active && weighted > 0 && weighted >= self.definition.threshold {
            weighted
        } else {
            0
        }
    }
}

/// Factor aggregate for a single day.
#[derive(Debug, Clone, Serialize)]
pub struct Assessables {
    date: Option<NaiveDate>,
    factors: Vec<FactorResult>,
    score: i64,
    weight: ActivityWeight,
}

impl Assessables {
    /// Counts every factor on `date`, sums the threshold-passing weighted
    /// counts of active ones and classifies the total against `bands`.
    /// Inactive factors keep their count for display but never score.
    pub fn evaluate(
        definitions: &[FactorDefinition],
        bands: &WeightBands,
        date: Option<NaiveDate>,
        source: &impl ActivitySource,
    ) -> Self {
        let factors: Vec<FactorResult> = definitions
            .iter()
            .map(|definition| FactorResult {
                count: ledger::count(definition, date, source),
                definition: definition.clone(),
            })
            .collect();

        let score = factors
            .iter()
            .map(FactorResult::contribution)
            .fold(0, i64::saturating_add);
        let weight = classify(score, bands);

        trace!(?date, score, %weight, "day assessed");

        Self {
            date,
            factors,
            score,
            weight,
        }
    }

    /// Placeholder aggregate for grid padding cells.
    pub fn blank() -> Self {
        Self {
            date: None,
            factors: Vec::new(),
            score: 0,
            weight: ActivityWeight::Empty,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn weight(&self) -> ActivityWeight {
        self.weight
    }

    pub fn factors(&self) -> &[FactorResult] {
        &self.factors
    }

    /// Factors of one entity type, highest count first.
    pub fn filter_by_type(&self, entity_type: EntityType) -> Vec<&FactorResult> {
        let mut matches: Vec<&FactorResult> = self
            .factors
            .iter()
            .filter(|result| result.definition.entity_type == entity_type)
            .collect();
        matches.sort_by(|a, b| b.count.cmp(&a.count));
        matches
    }

    pub fn active_factors(&self) -> Vec<&FactorResult> {
        self.factors
            .iter()
            .filter(|result| result.weighted() >= result.definition.threshold)
            .collect()
    }

    /// Factors at or under their threshold. A factor sitting exactly on its
    /// threshold appears here and in `active_factors`.
    pub fn inactive_factors(&self) -> Vec<&FactorResult> {
        self.factors
            .iter()
            .filter(|result| result.weighted() <= result.definition.threshold)
            .collect()
    }

    pub async fn toggle_active<S>(&mut self, store: &S, factor_id: uuid::Uuid) -> Result<FactorUpdate, FactorError>
    where
        S: AssessmentStore + ?Sized,
    {
        self.change(store, factor_id, FactorChange::ToggleActive).await
    }

    pub async fn set_threshold<S>(
        &mut self,
        store: &S,
        factor_id: uuid::Uuid,
        value: i64,
    ) -> Result<FactorUpdate, FactorError>
    where
        S: AssessmentStore + ?Sized,
    {
        self.change(store, factor_id, FactorChange::Threshold(value)).await
    }

    pub async fn set_weight<S>(
        &mut self,
        store: &S,
        factor_id: uuid::Uuid,
        value: i64,
    ) -> Result<FactorUpdate, FactorError>
    where
        S: AssessmentStore + ?Sized,
    {
        self.change(store, factor_id, FactorChange::Weight(value)).await
    }

    // The change is applied to the stored definition, then mirrored into
    // this snapshot. The score and weight are left as they were; callers
    // rebuild.
    async fn change<S>(
        &mut self,
        store: &S,
        factor_id: uuid::Uuid,
        change: FactorChange,
    ) -> Result<FactorUpdate, FactorError>
    where
        S: AssessmentStore + ?Sized,
    {
        if !self.factors.iter().any(|result| result.definition.id == factor_id) {
            return Err(FactorError::NotFound(factor_id));
        }

        let update = factors::change_by_id(store, factor_id, change).await?;
        if let Some(result) = self
            .factors
            .iter_mut()
            .find(|result| result.definition.id == factor_id)
        {
            result.definition = update.current.clone();
        }
        Ok(update)
    }
}

/// Maps a day score onto the configured bands.
///
/// Bands are walked heaviest first and each adjacent pair `(i, i + 1)`
/// forms the interval `[bands[i + 1].value, bands[i].value - 1]`, labelled
/// with the lighter band. Scores at or past the heaviest band's lower bound
/// take that band, and anything above the largest `default_value` is
/// forced to `Significant`.
pub fn classify(score: i64, bands: &WeightBands) -> ActivityWeight {
    if score == 0 {
        return ActivityWeight::Empty;
    }

    let descending: Vec<_> = bands.as_slice().iter().rev().collect();
    let mut weight = None;

    for pair in descending.windows(2) {
        let (upper_band, lower_band) = (pair[0], pair[1]);
        let lower = lower_band.value;
        let upper = upper_band.value - 1;
        if score < lower || score > upper {
            continue;
        }

        match lower_band.weight() {
            Some(found) => {
                weight = Some(found);
                break;
            }
            None => warn!(label = %lower_band.label, "unknown weight band label"),
        }
    }

    if weight.is_none() {
        if let Some(top) = descending.first().filter(|top| score >= top.value) {
            weight = top.weight();
        }
    }

    if let Some(heaviest) = bands.heaviest_by_default() {
        if score > heaviest.default_value {
            weight = Some(ActivityWeight::Significant);
        }
    }

    weight.unwrap_or(ActivityWeight::Light)
}
