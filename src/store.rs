use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::ledger::ActivityLedger;
use crate::models::{FactorDefinition, WeightBands};

/// Persistence collaborator the assessment engine reads from and writes
/// factor changes back to.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn load_factor_definitions(&self) -> anyhow::Result<Vec<FactorDefinition>>;

    async fn load_weight_bands(&self) -> anyhow::Result<WeightBands>;

    async fn save_factor_definition(&self, factor: &FactorDefinition) -> anyhow::Result<()>;

    /// Activity between `start` and `end` inclusive, narrowed by `search_term`.
    async fn load_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        search_term: &str,
    ) -> anyhow::Result<ActivityLedger>;

    async fn find_factor(&self, id: Uuid) -> anyhow::Result<Option<FactorDefinition>> {
        Ok(self
            .load_factor_definitions()
            .await?
            .into_iter()
            .find(|factor| factor.id == id))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    factors: Vec<FactorDefinition>,
    bands: WeightBands,
    ledger: ActivityLedger,
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(factors: Vec<FactorDefinition>, bands: WeightBands, ledger: ActivityLedger) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                factors,
                bands,
                ledger,
            }),
        }
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn load_factor_definitions(&self) -> anyhow::Result<Vec<FactorDefinition>> {
        Ok(self.lock()?.factors.clone())
    }

    async fn load_weight_bands(&self) -> anyhow::Result<WeightBands> {
        Ok(self.lock()?.bands.clone())
    }

    async fn save_factor_definition(&self, factor: &FactorDefinition) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        match state.factors.iter_mut().find(|existing| existing.id == factor.id) {
            Some(existing) => *existing = factor.clone(),
            None => state.factors.push(factor.clone()),
        }
        Ok(())
    }

    async fn load_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        search_term: &str,
    ) -> anyhow::Result<ActivityLedger> {
        Ok(self.lock()?.ledger.within(start, end).matching(search_term))
    }
}
