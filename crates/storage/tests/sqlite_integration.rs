use std::time::Duration as StdDuration;

use chrono::Duration;
use prep_core::model::{Badge, Difficulty, LearnerId, ProgressRecord, Question, QuestionId, Skill};
use prep_core::time::fixed_now;
use storage::repository::{ProgressRepository, Storage, StorageError};
use storage::sqlite::{SqliteOptions, SqliteRepository};

fn question(skill: &str, difficulty: Difficulty) -> Question {
    Question::new(
        QuestionId::from(1),
        Skill::new(skill),
        difficulty,
        vec!["a".into(), "b".into()],
        0,
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_stats_and_badges() {
    let repo = connect("memdb_roundtrip").await;
    let ada = LearnerId::new("ada").unwrap();

    let mut record = ProgressRecord::new();
    for _ in 0..5 {
        record.apply_answer(&question("Algebra", Difficulty::Hard), true);
    }
    record.apply_answer(&question("Geometry", Difficulty::Easy), false);
    assert!(record.has_badge(Badge::FiveStreak));

    let version = repo
        .save_progress(&ada, &record, 0, fixed_now())
        .await
        .expect("save");
    assert_eq!(version, 1);

    let stored = repo.load_progress(&ada).await.unwrap().expect("stored");
    assert_eq!(stored.version, 1);
    assert_eq!(stored.updated_at, fixed_now());
    assert_eq!(stored.record, record);
    assert_eq!(stored.record.points(), 150);
    assert_eq!(stored.record.streak(), 0);
    let geometry = stored.record.stat(&Skill::new("Geometry")).unwrap();
    assert_eq!((geometry.attempts(), geometry.correct()), (1, 0));
}

#[tokio::test]
async fn sqlite_rejects_stale_writes() {
    let repo = connect("memdb_conflict").await;
    let ada = LearnerId::new("ada").unwrap();
    let record = ProgressRecord::new();

    repo.save_progress(&ada, &record, 0, fixed_now()).await.unwrap();

    let err = repo
        .save_progress(&ada, &record, 0, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { expected: 0, found: 1 }));

    let v2 = repo
        .save_progress(&ada, &record, 1, fixed_now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(v2, 2);

    let err = repo
        .save_progress(&ada, &record, 1, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { expected: 1, found: 2 }));

    let stored = repo.load_progress(&ada).await.unwrap().unwrap();
    assert_eq!(stored.updated_at, fixed_now() + Duration::minutes(1));
}

#[tokio::test]
async fn sqlite_update_without_row_is_conflict() {
    let repo = connect("memdb_missing").await;
    let bob = LearnerId::new("bob").unwrap();

    let err = repo
        .save_progress(&bob, &ProgressRecord::new(), 3, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { expected: 3, found: 0 }));
}

#[tokio::test]
async fn sqlite_delete_and_migrate_are_idempotent() {
    let repo = connect("memdb_delete").await;
    repo.migrate().await.expect("second migrate");

    let ada = LearnerId::new("ada").unwrap();
    repo.save_progress(&ada, &ProgressRecord::new(), 0, fixed_now())
        .await
        .unwrap();

    assert!(repo.delete_progress(&ada).await.unwrap());
    assert!(!repo.delete_progress(&ada).await.unwrap());
    assert!(repo.load_progress(&ada).await.unwrap().is_none());
}

#[tokio::test]
async fn storage_sqlite_wires_progress_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let ada = LearnerId::new("ada").unwrap();
    assert!(storage.progress.load_progress(&ada).await.unwrap().is_none());
}

#[tokio::test]
async fn single_connection_pool_still_serves_reads_and_writes() {
    let options = SqliteOptions {
        max_connections: 1,
        acquire_timeout: StdDuration::from_secs(2),
        busy_timeout: StdDuration::from_millis(250),
    };
    let storage = Storage::sqlite_with("sqlite:file:memdb_single_conn?mode=memory&cache=shared", options)
        .await
        .expect("storage");
    let ada = LearnerId::new("ada").unwrap();

    let mut record = ProgressRecord::new();
    record.apply_answer(&question("Algebra", Difficulty::Medium), true);
    let version = storage
        .progress
        .save_progress(&ada, &record, 0, fixed_now())
        .await
        .unwrap();
    let stored = storage.progress.load_progress(&ada).await.unwrap().unwrap();
    assert_eq!(stored.version, version);
    assert_eq!(stored.record.points(), 20);
}
