use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use prep_core::model::{Badge, ProgressRecord, Skill, SkillStat};
use sqlx::Row;

use crate::repository::{StorageError, StoredProgress};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_version(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid version: {v}")))
}

pub(crate) fn version_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("version overflow".into()))
}

/// JSON text for the `skill_stats` and `badges` columns.
pub(crate) fn encode_collections(record: &ProgressRecord) -> Result<(String, String), StorageError> {
    let skill_stats = serde_json::to_string(record.skill_stats()).map_err(ser)?;
    let badges = serde_json::to_string(record.badges()).map_err(ser)?;
    Ok((skill_stats, badges))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredProgress, StorageError> {
    let points = i64_to_u32("points", row.try_get("points").map_err(ser)?)?;
    let streak = i64_to_u32("streak", row.try_get("streak").map_err(ser)?)?;

    let skill_stats_json: String = row.try_get("skill_stats").map_err(ser)?;
    let skill_stats: BTreeMap<Skill, SkillStat> =
        serde_json::from_str(&skill_stats_json).map_err(ser)?;

    let badges_json: String = row.try_get("badges").map_err(ser)?;
    let badges: BTreeSet<Badge> = serde_json::from_str(&badges_json).map_err(ser)?;

    let version = i64_to_version(row.try_get("version").map_err(ser)?)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Ok(StoredProgress {
        record: ProgressRecord::from_persisted(points, streak, skill_stats, badges),
        version,
        updated_at,
    })
}
