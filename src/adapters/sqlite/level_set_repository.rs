//! SQLite implementation of the LevelSetSink.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Grade, Level, LevelSet, ReorderReport};
use crate::domain::ports::{LevelSetSink, LevelSetSummary};

#[derive(Clone)]
pub struct SqliteLevelSetSink {
    pool: SqlitePool,
}

impl SqliteLevelSetSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored sets, newest first.
    pub async fn list_sets(&self) -> DomainResult<Vec<LevelSetSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT id, name, level_count, mean_deviation, created_at FROM level_sets ORDER BY created_at DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Load a stored set with its levels in curve order.
    pub async fn get_set(&self, id: Uuid) -> DomainResult<Option<LevelSet>> {
        let row: Option<LevelSetRow> = sqlx::query_as(
            "SELECT id, name, failed_count, difficulty_profile, generation_config, reorder, created_at FROM level_sets WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let level_rows: Vec<LevelRow> = sqlx::query_as(
            "SELECT position, name, artifact, actual_difficulty, grade, target_difficulty, source_task_index
             FROM levels WHERE level_set_id = ? ORDER BY position ASC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let levels = level_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<DomainResult<Vec<Level>>>()?;
        row.into_level_set(levels).map(Some)
    }
}

#[async_trait]
impl LevelSetSink for SqliteLevelSetSink {
    async fn persist(&self, set: &LevelSet) -> DomainResult<String> {
        let id = set.id.to_string();
        let profile_json = serde_json::to_string(&set.difficulty_profile)?;
        let config_json = serde_json::to_string(&set.generation_config)?;
        let reorder_json = serde_json::to_string(&set.reorder)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO level_sets (id, name, level_count, failed_count, difficulty_profile, generation_config, reorder, mean_deviation, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&set.name)
        .bind(to_i64(set.levels.len()))
        .bind(to_i64(set.failed_count))
        .bind(&profile_json)
        .bind(&config_json)
        .bind(&reorder_json)
        .bind(set.reorder.mean_deviation_after)
        .bind(set.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::PersistenceFailed(e.to_string()))?;

        for level in &set.levels {
            sqlx::query(
                r#"INSERT INTO levels (level_set_id, position, name, artifact, actual_difficulty, grade, target_difficulty, source_task_index)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&id)
            .bind(to_i64(level.position))
            .bind(&level.name)
            .bind(serde_json::to_string(&level.artifact)?)
            .bind(level.actual_difficulty)
            .bind(level.grade.as_str())
            .bind(level.target_difficulty)
            .bind(to_i64(level.source_task_index))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::PersistenceFailed(e.to_string()))?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn list(&self) -> DomainResult<Vec<LevelSetSummary>> {
        self.list_sets().await
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    name: String,
    level_count: i64,
    mean_deviation: f64,
    created_at: String,
}

impl TryFrom<SummaryRow> for LevelSetSummary {
    type Error = DomainError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            level_count: to_usize(row.level_count),
            mean_deviation: row.mean_deviation,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LevelSetRow {
    id: String,
    name: String,
    failed_count: i64,
    difficulty_profile: String,
    generation_config: Option<String>,
    reorder: String,
    created_at: String,
}

impl LevelSetRow {
    fn into_level_set(self, levels: Vec<Level>) -> DomainResult<LevelSet> {
        let generation_config = match self.generation_config {
            Some(json) => serde_json::from_str(&json)?,
            None => serde_json::Value::Null,
        };
        let reorder: ReorderReport = serde_json::from_str(&self.reorder)?;

        Ok(LevelSet {
            id: parse_uuid(&self.id)?,
            name: self.name,
            actual_difficulties: levels.iter().map(|l| l.actual_difficulty).collect(),
            grades: levels.iter().map(|l| l.grade).collect(),
            levels,
            difficulty_profile: serde_json::from_str(&self.difficulty_profile)?,
            generation_config,
            reorder,
            failed_count: to_usize(self.failed_count),
            created_at: parse_datetime(&self.created_at)?,
            storage_id: Some(self.id),
        })
    }
}

#[derive(sqlx::FromRow)]
struct LevelRow {
    position: i64,
    name: String,
    artifact: String,
    actual_difficulty: f64,
    grade: String,
    target_difficulty: f64,
    source_task_index: i64,
}

impl TryFrom<LevelRow> for Level {
    type Error = DomainError;

    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            position: to_usize(row.position),
            name: row.name,
            artifact: serde_json::from_str(&row.artifact)?,
            actual_difficulty: row.actual_difficulty,
            grade: row
                .grade
                .parse::<Grade>()
                .map_err(DomainError::SerializationError)?,
            target_difficulty: row.target_difficulty,
            source_task_index: to_usize(row.source_task_index),
        })
    }
}
