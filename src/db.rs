use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::factors::validate as validate_factor;
use crate::ledger::ActivityLedger;
use crate::models::{
    ActionKind, ActivityEntry, Colour, EntityType, FactorDefinition, WeightBand, WeightBands,
};
use crate::store::AssessmentStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed assessment store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn like_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

fn entity_table(entity: EntityType) -> anyhow::Result<(&'static str, &'static str)> {
    match entity {
        EntityType::Records => Ok(("work_log.records", "message")),
        EntityType::Jobs => Ok(("work_log.jobs", "title")),
        EntityType::Tasks => Ok(("work_log.tasks", "content")),
        EntityType::Notes => Ok(("work_log.notes", "body")),
        other => bail!("no activity table for {other}"),
    }
}

async fn load_entries(
    tx: &mut Transaction<'_, Postgres>,
    entity: EntityType,
    start: NaiveDate,
    end: NaiveDate,
    pattern: Option<&str>,
) -> anyhow::Result<Vec<ActivityEntry>> {
    let (table, text_column) = entity_table(entity)?;
    let job_column = if entity == EntityType::Jobs { "NULL::uuid" } else { "job_id" };
    let query = format!(
        "SELECT id, {job_column} AS job_id, created_on, {text_column} AS text \
         FROM {table} \
         WHERE created_on BETWEEN $1 AND $2 \
         AND ($3::text IS NULL OR {text_column} ILIKE $3)"
    );

    let rows = sqlx::query(&query)
        .bind(start)
        .bind(end)
        .bind(pattern)
        .fetch_all(&mut **tx)
        .await
        .with_context(|| format!("failed to load {entity} activity"))?;

    Ok(rows
        .into_iter()
        .map(|row| ActivityEntry {
            id: row.get("id"),
            entity,
            job_id: row.get("job_id"),
            occurred_on: row.get("created_on"),
            text: row.get("text"),
        })
        .collect())
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn load_factor_definitions(&self) -> anyhow::Result<Vec<FactorDefinition>> {
        let rows = sqlx::query(
            "SELECT id, entity_type, action_kind, weight, threshold, active \
             FROM work_log.assessment_factors \
             ORDER BY entity_type, action_kind",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut factors = Vec::with_capacity(rows.len());
        for row in rows {
            let entity_type: String = row.get("entity_type");
            let action_kind: String = row.get("action_kind");
            let factor = FactorDefinition {
                id: row.get("id"),
                entity_type: entity_type
                    .parse()
                    .with_context(|| format!("unknown entity type '{entity_type}'"))?,
                action_kind: action_kind
                    .parse()
                    .with_context(|| format!("unknown action kind '{action_kind}'"))?,
                weight: row.get("weight"),
                threshold: row.get("threshold"),
                active: row.get("active"),
            };
            validate_factor(&factor)
                .with_context(|| format!("stored factor {} is misconfigured", factor.id))?;
            factors.push(factor);
        }

        Ok(factors)
    }

    async fn load_weight_bands(&self) -> anyhow::Result<WeightBands> {
        let rows = sqlx::query(
            "SELECT label, value, default_value, colour FROM work_log.weight_bands ORDER BY value",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut bands = Vec::with_capacity(rows.len());
        for row in rows {
            let colour: Option<String> = row.get("colour");
            bands.push(WeightBand {
                label: row.get("label"),
                value: row.get("value"),
                default_value: row.get("default_value"),
                colour: colour.as_deref().map(str::parse::<Colour>).transpose()?,
            });
        }

        Ok(WeightBands::new(bands))
    }

    async fn save_factor_definition(&self, factor: &FactorDefinition) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO work_log.assessment_factors
            (id, entity_type, action_kind, weight, threshold, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET weight = EXCLUDED.weight,
                threshold = EXCLUDED.threshold,
                active = EXCLUDED.active
            "#,
        )
        .bind(factor.id)
        .bind(factor.entity_type.as_ref())
        .bind(factor.action_kind.as_ref())
        .bind(factor.weight)
        .bind(factor.threshold)
        .bind(factor.active)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save factor {}", factor.id))?;

        Ok(())
    }

    async fn load_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        search_term: &str,
    ) -> anyhow::Result<ActivityLedger> {
        let pattern = like_pattern(search_term);
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let mut ledger = ActivityLedger::default();
        for entity in [EntityType::Records, EntityType::Jobs, EntityType::Tasks, EntityType::Notes] {
            for entry in load_entries(&mut tx, entity, start, end, pattern.as_deref()).await? {
                ledger.push(entry);
            }
        }
        tx.commit().await?;

        debug!(%start, %end, entries = ledger.len(), "activity ledger loaded");
        Ok(ledger)
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let factors = vec![
        (EntityType::Records, ActionKind::Create, 1, 0, true),
        (EntityType::Records, ActionKind::Interaction, 1, 0, false),
        (EntityType::Jobs, ActionKind::Create, 2, 3, true),
        (EntityType::Jobs, ActionKind::Interaction, 1, 2, true),
        (EntityType::Tasks, ActionKind::Create, 1, 0, true),
        (EntityType::Notes, ActionKind::Create, 1, 0, true),
        (EntityType::Projects, ActionKind::Create, 3, 0, false),
    ];

    for (entity_type, action_kind, weight, threshold, active) in factors {
        sqlx::query(
            r#"
            INSERT INTO work_log.assessment_factors
            (id, entity_type, action_kind, weight, threshold, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (entity_type, action_kind) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entity_type.as_ref())
        .bind(action_kind.as_ref())
        .bind(weight as i64)
        .bind(threshold as i64)
        .bind(active)
        .execute(pool)
        .await?;
    }

    for band in WeightBands::standard().as_slice() {
        sqlx::query(
            r#"
            INSERT INTO work_log.weight_bands (label, value, default_value, colour)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (label) DO UPDATE
            SET value = EXCLUDED.value, default_value = EXCLUDED.default_value
            "#,
        )
        .bind(&band.label)
        .bind(band.value)
        .bind(band.default_value)
        .bind(band.colour.map(|colour| colour.to_hex()))
        .execute(pool)
        .await?;
    }

    let day = |d: u32| NaiveDate::from_ymd_opt(2026, 3, d).context("invalid date");
    let jobs = vec![
        ("seed-job-001", "Billing service migration", day(2)?),
        ("seed-job-002", "Quarterly client audit", day(9)?),
    ];
    let mut tx = pool.begin().await?;
    for (source_key, title, created_on) in jobs {
        insert_entry(&mut tx, EntityType::Jobs, None, title, created_on, source_key).await?;
    }

    let activity = vec![
        (EntityType::Records, Some("seed-job-001"), "Mapped legacy invoice tables", day(2)?, "seed-rec-001"),
        (EntityType::Records, Some("seed-job-001"), "Wrote migration dry-run", day(2)?, "seed-rec-002"),
        (EntityType::Records, Some("seed-job-001"), "Paired on cutover plan", day(3)?, "seed-rec-003"),
        (EntityType::Tasks, Some("seed-job-001"), "Schedule cutover window", day(3)?, "seed-task-001"),
        (EntityType::Records, Some("seed-job-002"), "Collected access logs", day(9)?, "seed-rec-004"),
        (EntityType::Records, Some("seed-job-002"), "Reviewed role matrix", day(10)?, "seed-rec-005"),
        (EntityType::Notes, Some("seed-job-002"), "Auditor prefers PDF exports", day(10)?, "seed-note-001"),
        (EntityType::Records, Some("seed-job-001"), "Hotfix after cutover", day(14)?, "seed-rec-006"),
    ];
    for (entity, job_key, text, created_on, source_key) in activity {
        let job_id = match job_key {
            Some(key) => find_job(&mut tx, key).await?,
            None => None,
        };
        insert_entry(&mut tx, entity, job_id, text, created_on, source_key).await?;
    }
    tx.commit().await?;

    info!("seed data inserted");
    Ok(())
}

async fn find_job(tx: &mut Transaction<'_, Postgres>, source_key: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM work_log.jobs WHERE source_key = $1")
        .bind(source_key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

/// Inserts one activity row; returns false when `source_key` already exists.
async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entity: EntityType,
    job_id: Option<Uuid>,
    text: &str,
    created_on: NaiveDate,
    source_key: &str,
) -> anyhow::Result<bool> {
    let (table, text_column) = entity_table(entity)?;
    let query = if entity == EntityType::Jobs {
        format!(
            "INSERT INTO {table} (id, {text_column}, created_on, source_key) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (source_key) DO NOTHING"
        )
    } else {
        format!(
            "INSERT INTO {table} (id, {text_column}, created_on, source_key, job_id) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (source_key) DO NOTHING"
        )
    };

    let mut statement = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(text)
        .bind(created_on)
        .bind(source_key);
    if entity != EntityType::Jobs {
        statement = statement.bind(job_id);
    }

    let result = statement.execute(&mut **tx).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        kind: EntityType,
        text: String,
        created_on: NaiveDate,
        job_key: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let job_id = match row.job_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Some(
                find_job(&mut tx, key)
                    .await?
                    .with_context(|| format!("row {} references unknown job '{key}'", line + 1))?,
            ),
            None => None,
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_entry(&mut tx, row.kind, job_id, &row.text, row.created_on, &source_key).await? {
            inserted += 1;
        }
    }
    tx.commit().await?;

    info!(inserted, path = %csv_path.display(), "activity imported");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("  "), None);
        assert_eq!(like_pattern("api"), Some("%api%".to_string()));
        assert_eq!(like_pattern("50%_off"), Some("%50\\%\\_off%".to_string()));
    }

    #[test]
    fn only_counted_entities_have_tables() {
        assert_eq!(entity_table(EntityType::Records).unwrap(), ("work_log.records", "message"));
        assert_eq!(entity_table(EntityType::Jobs).unwrap().1, "title");
        assert!(entity_table(EntityType::Companies).is_err());
    }
}
