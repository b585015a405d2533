//! Multi-set runs persisted through the SQLite sink.

mod common;

use std::sync::Arc;
use uuid::Uuid;

use common::{fast_config, linear_run};
use levelforge::adapters::generation::ScriptedGenerationService;
use levelforge::adapters::sqlite::{initialize_database, Migrator, SqliteLevelSetSink};
use levelforge::domain::models::{DatabaseConfig, MultiSetConfig};
use levelforge::domain::ports::LevelSetSink;
use levelforge::RunCoordinator;

async fn file_sink(dir: &tempfile::TempDir) -> (SqliteLevelSetSink, sqlx::SqlitePool) {
    let config = DatabaseConfig {
        path: dir.path().join("data").join("sets.db").to_string_lossy().into_owned(),
        max_connections: 2,
    };
    let pool = initialize_database(&config).await.unwrap();
    (SqliteLevelSetSink::new(pool.clone()), pool)
}

#[tokio::test]
async fn test_multi_set_run_persists_every_set() {
    let dir = tempfile::tempdir().unwrap();
    let (sink, _pool) = file_sink(&dir).await;
    let coordinator = RunCoordinator::new(Arc::new(ScriptedGenerationService::new()), fast_config(3))
        .with_sink(Arc::new(sink.clone()));

    let run = linear_run("Tides", 5).with_multi_set(MultiSetConfig {
        set_count: 2,
        difficulty_shift_per_set: 0.1,
        max_difficulty_clamp: 0.95,
    });
    let outcome = coordinator.start_run(run).join().await.unwrap();

    let sets = outcome.sets();
    assert_eq!(sets.len(), 2);
    for set in sets {
        let storage_id = set.storage_id.as_deref().expect("set was persisted");
        let loaded = sink
            .get_set(Uuid::parse_str(storage_id).unwrap())
            .await
            .unwrap()
            .expect("stored set is readable");
        assert_eq!(loaded.name, set.name);
        assert_eq!(loaded.levels, set.levels);
        assert_eq!(loaded.difficulty_profile, set.difficulty_profile);
    }

    let listed = sink.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    let mut names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Tides #1", "Tides #2"]);
}

#[tokio::test]
async fn test_second_set_targets_are_shifted() {
    let dir = tempfile::tempdir().unwrap();
    let (sink, _pool) = file_sink(&dir).await;
    let coordinator = RunCoordinator::new(Arc::new(ScriptedGenerationService::new()), fast_config(5))
        .with_sink(Arc::new(sink));

    let run = linear_run("Shift", 5).with_multi_set(MultiSetConfig {
        set_count: 2,
        difficulty_shift_per_set: 0.05,
        max_difficulty_clamp: 1.0,
    });
    let sets = coordinator.start_run(run).join().await.unwrap().into_sets();

    let first = &sets[0].difficulty_profile;
    let second = &sets[1].difficulty_profile;
    for (a, b) in first.iter().zip(second) {
        assert!((b - a - 0.05).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_reopening_database_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let (_, pool) = file_sink(&dir).await;
    let version = Migrator::new(pool.clone()).get_current_version().await.unwrap();
    pool.close().await;

    let (_, reopened) = file_sink(&dir).await;
    assert_eq!(
        Migrator::new(reopened).get_current_version().await.unwrap(),
        version
    );
    assert!(version >= 1);
}
