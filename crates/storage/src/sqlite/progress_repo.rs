use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{LearnerId, ProgressRecord};
use sqlx::Row;

use crate::repository::{ProgressRepository, StorageError, StoredProgress};

use super::SqliteRepository;
use super::mapping::{encode_collections, i64_to_version, map_progress_row, version_to_i64};

impl SqliteRepository {
    async fn current_version(&self, learner: &LearnerId) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT version FROM progress WHERE learner_id = ?1")
            .bind(learner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        match row {
            Some(row) => i64_to_version(
                row.try_get("version")
                    .map_err(|err| StorageError::Serialization(err.to_string()))?,
            ),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(
        &self,
        learner: &LearnerId,
    ) -> Result<Option<StoredProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT points, streak, skill_stats, badges, version, updated_at
            FROM progress
            WHERE learner_id = ?1
            ",
        )
        .bind(learner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn save_progress(
        &self,
        learner: &LearnerId,
        record: &ProgressRecord,
        expected_version: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let (skill_stats, badges) = encode_collections(record)?;
        let new_version = expected_version + 1;

        let result = if expected_version == 0 {
            sqlx::query(
                r"
                INSERT INTO progress (
                    learner_id, points, streak, skill_stats, badges, version, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(learner_id) DO NOTHING
                ",
            )
            .bind(learner.as_str())
            .bind(i64::from(record.points()))
            .bind(i64::from(record.streak()))
            .bind(skill_stats.as_str())
            .bind(badges.as_str())
            .bind(version_to_i64(new_version)?)
            .bind(updated_at)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r"
                UPDATE progress SET
                    points = ?2,
                    streak = ?3,
                    skill_stats = ?4,
                    badges = ?5,
                    version = ?6,
                    updated_at = ?7
                WHERE learner_id = ?1 AND version = ?8
                ",
            )
            .bind(learner.as_str())
            .bind(i64::from(record.points()))
            .bind(i64::from(record.streak()))
            .bind(skill_stats.as_str())
            .bind(badges.as_str())
            .bind(version_to_i64(new_version)?)
            .bind(updated_at)
            .bind(version_to_i64(expected_version)?)
            .execute(&self.pool)
            .await
        }
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict {
                expected: expected_version,
                found: self.current_version(learner).await?,
            });
        }
        Ok(new_version)
    }

    async fn delete_progress(&self, learner: &LearnerId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM progress WHERE learner_id = ?1")
            .bind(learner.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
