use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::{ActionKind, ActivityEntry, EntityType, FactorDefinition};

/// Read-only counting queries a scoring pass needs from the work log.
pub trait ActivitySource {
    fn count_records_created(&self, date: NaiveDate) -> i64;
    fn count_jobs_created(&self, date: NaiveDate) -> i64;
    fn count_distinct_jobs_referenced_by_records(&self, date: NaiveDate) -> i64;
    fn count_tasks_created(&self, date: NaiveDate) -> i64;
    fn count_notes_created(&self, date: NaiveDate) -> i64;
}

/// Raw occurrence count of one factor on one date.
///
/// Missing dates (blank grid cells) and entity types without a counting
/// query yield zero instead of an error.
pub fn count(factor: &FactorDefinition, date: Option<NaiveDate>, source: &impl ActivitySource) -> i64 {
    let Some(date) = date else {
        return 0;
    };

    match (factor.entity_type, factor.action_kind) {
        (EntityType::Records, _) => source.count_records_created(date),
        (EntityType::Jobs, ActionKind::Create) => source.count_jobs_created(date),
        (EntityType::Jobs, ActionKind::Interaction) => {
            source.count_distinct_jobs_referenced_by_records(date)
        }
        // TODO: interaction counts for tasks and notes need their own query;
        // they currently share the create query.
        (EntityType::Tasks, _) => source.count_tasks_created(date),
        (EntityType::Notes, _) => source.count_notes_created(date),
        (EntityType::Companies | EntityType::People | EntityType::Projects, _) => 0,
    }
}

/// In-memory snapshot of work-log activity for a date window.
#[derive(Debug, Clone, Default)]
pub struct ActivityLedger {
    entries: Vec<ActivityEntry>,
}

impl ActivityLedger {
    pub fn new(entries: Vec<ActivityEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: ActivityEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries falling inside `[start, end]`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            self.entries
                .iter()
                .filter(|entry| entry.occurred_on >= start && entry.occurred_on <= end)
                .cloned()
                .collect(),
        )
    }

    /// Entries whose text contains `term`, ignoring case. A blank term keeps
    /// everything.
    pub fn matching(&self, term: &str) -> Self {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }

        Self::new(
            self.entries
                .iter()
                .filter(|entry| entry.text.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        )
    }

    fn count_on(&self, entity: EntityType, date: NaiveDate) -> i64 {
        self.entries
            .iter()
            .filter(|entry| entry.entity == entity && entry.occurred_on == date)
            .count() as i64
    }
}

impl ActivitySource for ActivityLedger {
    fn count_records_created(&self, date: NaiveDate) -> i64 {
        self.count_on(EntityType::Records, date)
    }

    fn count_jobs_created(&self, date: NaiveDate) -> i64 {
        self.count_on(EntityType::Jobs, date)
    }

    fn count_distinct_jobs_referenced_by_records(&self, date: NaiveDate) -> i64 {
        self.entries
            .iter()
            .filter(|entry| entry.entity == EntityType::Records && entry.occurred_on == date)
            .filter_map(|entry| entry.job_id)
            .collect::<HashSet<_>>()
            .len() as i64
    }

    fn count_tasks_created(&self, date: NaiveDate) -> i64 {
        self.count_on(EntityType::Tasks, date)
    }

    fn count_notes_created(&self, date: NaiveDate) -> i64 {
        self.count_on(EntityType::Notes, date)
    }
}
