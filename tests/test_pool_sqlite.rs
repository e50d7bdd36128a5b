#![cfg(feature = "pool")]

use std::sync::Arc;

use sql_tablemap::prelude::*;
use tempfile::tempdir;

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Job {
        pub id: i64,
        pub name: String,
        pub attempts: i64,
    }
}

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

fn registry() -> Result<Arc<TypeRegistry>, TableMapError> {
    let registry = TypeRegistry::new();
    registry.register::<Job>(Some("jobs")).set_keys(true, &["id"])?;
    Ok(Arc::new(registry))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pooled_connections_share_the_database_file() -> Result<(), Box<dyn std::error::Error>> {
    let cap = ConfigAndPool::sqlite_builder(unique_db_path("jobs"))
        .pool_size(3)
        .build()
        .await?;
    let registry = registry()?;

    let conn = cap.get_connection().await?;
    conn.interact(|db| {
        db.execute_batch(
            "CREATE TABLE jobs (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, attempts INTEGER NOT NULL);",
        )
    })
    .await?;
    drop(conn);

    let mut handles = Vec::new();
    for i in 0..12 {
        let cap = cap.clone();
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let conn = cap.get_connection().await?;
            conn.interact(move |db| {
                let mut jobs = [Job {
                    id: 0,
                    name: format!("job-{i}"),
                    attempts: i,
                }];
                crud::insert(&registry, db, &mut jobs)?;
                Ok(jobs[0].id)
            })
            .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 12);

    let conn = cap.get_connection().await?;
    let registry_for_read = Arc::clone(&registry);
    let jobs = conn
        .interact(move |db| {
            let mut jobs: Vec<Job> = Vec::new();
            crud::select_into(
                &registry_for_read,
                db,
                &mut jobs,
                "SELECT * FROM jobs ORDER BY attempts",
                &[],
            )?;
            Ok(jobs)
        })
        .await?;
    assert_eq!(jobs.len(), 12);
    assert_eq!(jobs[11].name, "job-11");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_inside_interact_come_back_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let cap = ConfigAndPool::new_sqlite(SqliteOptions::new(unique_db_path("errors"))).await?;
    let registry = registry()?;

    let conn = cap.get_connection().await?;
    let err = conn
        .interact(move |db| {
            let mut job = Job::default();
            crud::get(&registry, db, &mut job, &[RowValues::Int(1)])
        })
        .await
        .unwrap_err();
    // the jobs table was never created
    assert!(matches!(err, TableMapError::Sqlite(_)));
    Ok(())
}

#[tokio::test]
async fn invalid_options_are_rejected_before_connecting() {
    let res = ConfigAndPool::sqlite_builder(String::new()).build().await;
    assert!(matches!(res, Err(TableMapError::ConfigError(_))));
}
