use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::FactorDefinition;
use crate::store::AssessmentStore;

#[derive(Debug, Error)]
pub enum FactorError {
    #[error("factor {0} not found")]
    NotFound(Uuid),

    #[error("weight must be zero or greater, got {0}")]
    NegativeWeight(i64),

    #[error("threshold must be zero or greater, got {0}")]
    NegativeThreshold(i64),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result of a persisted factor change. Assessments built before the
/// change keep their old scores until the month is built again.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "existing assessments are stale until the month is rebuilt"]
pub struct FactorUpdate {
    pub previous: FactorDefinition,
    pub current: FactorDefinition,
}

impl FactorUpdate {
    pub fn requires_reassessment(&self) -> bool {
        true
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorChange {
    ToggleActive,
    Threshold(i64),
    Weight(i64),
}

/// Checks the non-negative weight and threshold invariant.
pub fn validate(factor: &FactorDefinition) -> Result<(), FactorError> {
    if factor.weight < 0 {
        return Err(FactorError::NegativeWeight(factor.weight));
    }
    if factor.threshold < 0 {
        return Err(FactorError::NegativeThreshold(factor.threshold));
    }
    Ok(())
}

impl FactorChange {
    fn validate(self) -> Result<(), FactorError> {
        match self {
            FactorChange::Threshold(value) if value < 0 => Err(FactorError::NegativeThreshold(value)),
            FactorChange::Weight(value) if value < 0 => Err(FactorError::NegativeWeight(value)),
            _ => Ok(()),
        }
    }

    fn apply(self, factor: &mut FactorDefinition) {
        match self {
            FactorChange::ToggleActive => factor.active = !factor.active,
            FactorChange::Threshold(value) => factor.threshold = value,
            FactorChange::Weight(value) => factor.weight = value,
        }
    }
}

/// Applies `change` to `factor` in place and persists it.
pub async fn apply_change<S>(
    store: &S,
    factor: &mut FactorDefinition,
    change: FactorChange,
) -> Result<FactorUpdate, FactorError>
where
    S: AssessmentStore + ?Sized,
{
    if let Err(err) = change.validate() {
        warn!(factor_id = %factor.id, error = %err, "rejected factor change");
        return Err(err);
    }

    let previous = factor.clone();
    change.apply(factor);
    store.save_factor_definition(factor).await?;

    info!(
        factor_id = %factor.id,
        factor = %factor.describe(),
        active = factor.active,
        weight = factor.weight,
        threshold = factor.threshold,
        "factor definition saved"
    );

    Ok(FactorUpdate {
        previous,
        current: factor.clone(),
    })
}

/// Reloads the stored definition, applies `change` and saves it.
pub(crate) async fn change_by_id<S>(store: &S, id: Uuid, change: FactorChange) -> Result<FactorUpdate, FactorError>
where
    S: AssessmentStore + ?Sized,
{
    let mut factor = store.find_factor(id).await?.ok_or(FactorError::NotFound(id))?;
    apply_change(store, &mut factor, change).await
}

pub async fn toggle_active<S>(store: &S, id: Uuid) -> Result<FactorUpdate, FactorError>
where
    S: AssessmentStore + ?Sized,
{
    change_by_id(store, id, FactorChange::ToggleActive).await
}

pub async fn set_threshold<S>(store: &S, id: Uuid, value: i64) -> Result<FactorUpdate, FactorError>
where
    S: AssessmentStore + ?Sized,
{
    change_by_id(store, id, FactorChange::Threshold(value)).await
}

pub async fn set_weight<S>(store: &S, id: Uuid, value: i64) -> Result<FactorUpdate, FactorError>
where
    S: AssessmentStore + ?Sized,
{
    change_by_id(store, id, FactorChange::Weight(value)).await
}
