//! Sync engine against the SQLite store: cache lifetime, reconciliation and
//! the degraded path when the employer API is down.

mod common;

use common::{complete_profile, create_user, memory_db, posting, ScriptedSource};
use job_portal_core::ports::DatabaseService;
use job_portal_core::sync::{RETAINED_DESCRIPTION, UNKNOWN_FIELD};
use job_portal_core::{ApplicationForm, ApplicationWorkflow, SyncEngine, SyncOutcome};
use std::time::Duration;

fn engine(
    db: std::sync::Arc<api_lib::adapters::DbAdapter>,
    source: std::sync::Arc<ScriptedSource>,
) -> SyncEngine {
    SyncEngine::new(db, source, chrono::Duration::seconds(900), Duration::from_secs(1))
}

#[tokio::test]
async fn second_sync_within_ttl_makes_no_request() {
    let db = memory_db().await;
    let source = ScriptedSource::serving(vec![posting("1001", "Sous Chef", &["Cooking"], &[])]);
    let engine = engine(db, source.clone());

    let first = engine.sync(false).await.unwrap();
    let second = engine.sync(false).await.unwrap();

    assert!(matches!(first.outcome, SyncOutcome::Refreshed(_)));
    assert_eq!(second.outcome, SyncOutcome::CacheHit);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(first.jobs, second.jobs);
}

#[tokio::test]
async fn stale_cache_and_force_both_refetch() {
    let db = memory_db().await;
    let source = ScriptedSource::serving(vec![posting("1001", "Sous Chef", &["Cooking"], &[])]);
    let engine = engine(db, source.clone());

    let start = chrono::Utc::now();
    engine.sync_at(false, start).await.unwrap();
    engine
        .sync_at(false, start + chrono::Duration::seconds(901))
        .await
        .unwrap();
    assert_eq!(source.fetch_count(), 2);

    engine.sync(true).await.unwrap();
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn refresh_inserts_updates_and_removes() {
    let db = memory_db().await;
    let source = ScriptedSource::serving(vec![
        posting("1001", "Sous Chef", &["Cooking"], &[]),
        posting("1002", "Cashier", &["Cash Handling"], &[]),
    ]);
    let engine = engine(db.clone(), source.clone());
    engine.sync(true).await.unwrap();
    let original_id = db
        .list_jobs()
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.external_id == "1001")
        .unwrap()
        .id;

    source.set_postings(vec![
        posting("1001", "Head Chef", &["Cooking", "Leadership"], &[]),
        posting("1003", "Driver", &["Driving"], &["Driver's License"]),
    ]);
    let result = engine.sync(true).await.unwrap();

    let SyncOutcome::Refreshed(summary) = result.outcome else {
        panic!("expected a refresh, got {:?}", result.outcome);
    };
    assert_eq!(
        (summary.inserted, summary.updated, summary.removed, summary.retained),
        (1, 1, 1, 0)
    );

    let jobs = db.list_jobs().await.unwrap();
    let mut ids: Vec<&str> = jobs.iter().map(|j| j.external_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1001", "1003"]);

    let updated = jobs.iter().find(|j| j.external_id == "1001").unwrap();
    assert_eq!(updated.id, original_id, "local id survives an update");
    assert_eq!(updated.title, "Head Chef");
    assert_eq!(updated.required_skills, vec!["Cooking", "Leadership"]);
}

#[tokio::test]
async fn jobs_with_applications_survive_an_empty_response() {
    let db = memory_db().await;
    let mut applied = posting("1001", "Sous Chef", &["Cooking"], &["Food Handler Certification"]);
    applied.description = None;
    let source = ScriptedSource::serving(vec![
        applied,
        posting("1002", "Cashier", &["Cash Handling"], &[]),
    ]);
    let engine = engine(db.clone(), source.clone());
    engine.sync(true).await.unwrap();

    let user = create_user(&db, "ana").await;
    complete_profile(db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;
    let job = db
        .list_jobs()
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.external_id == "1001")
        .unwrap();
    ApplicationWorkflow::new(db.clone(), source.clone(), Duration::from_secs(1))
        .submit_application(user.user_id, job.id, ApplicationForm::default())
        .await
        .unwrap();

    source.set_postings(Vec::new());
    let result = engine.sync(true).await.unwrap();

    let SyncOutcome::Refreshed(summary) = result.outcome else {
        panic!("expected a refresh, got {:?}", result.outcome);
    };
    assert_eq!((summary.removed, summary.retained), (1, 1));

    let jobs = db.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job.id);
    assert_eq!(jobs[0].description, RETAINED_DESCRIPTION);
    assert_ne!(jobs[0].title, UNKNOWN_FIELD);
    assert_eq!(db.list_applications_for_user(user.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_source_seeds_an_empty_cache() {
    let db = memory_db().await;
    let source = ScriptedSource::unreachable();
    let engine = engine(db.clone(), source.clone());

    let result = engine.sync(false).await.unwrap();

    assert!(result.is_degraded());
    assert!(matches!(
        result.outcome,
        SyncOutcome::Degraded { seeded: true, .. }
    ));
    assert_eq!(result.jobs.len(), 6);
    assert!(result.jobs.iter().any(|j| j.external_id == "1001"));
    assert_eq!(engine.last_synced_at(), None);

    // A failed refresh does not count as a sync, so the next read retries.
    engine.sync(false).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn unreachable_source_keeps_the_last_known_cache() {
    let db = memory_db().await;
    let source = ScriptedSource::serving(vec![posting("42", "Sous Chef", &["Cooking"], &[])]);
    let engine = engine(db.clone(), source.clone());
    engine.sync(true).await.unwrap();
    let synced_at = engine.last_synced_at();

    source.go_down();
    let result = engine.sync(true).await.unwrap();

    assert!(matches!(
        result.outcome,
        SyncOutcome::Degraded { seeded: false, .. }
    ));
    assert_eq!(result.jobs.len(), 1);
    assert_eq!(result.jobs[0].external_id, "42");
    assert_eq!(engine.last_synced_at(), synced_at);
}

#[tokio::test]
async fn last_sync_time_is_readable_while_a_refresh_is_in_flight() {
    let db = memory_db().await;
    let source = ScriptedSource::serving(vec![posting("42", "Sous Chef", &["Cooking"], &[])]);
    let engine = std::sync::Arc::new(engine(db, source.clone()));
    engine.sync(true).await.unwrap();
    let first = engine.last_synced_at().unwrap();

    source.set_fetch_delay(Duration::from_millis(600));
    let refresh = tokio::spawn({
        let engine = engine.clone();
        async move { engine.sync(true).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let read = tokio::time::timeout(Duration::from_millis(50), async { engine.last_synced_at() })
        .await
        .expect("reading the sync time waited on the refresh");
    assert_eq!(read, Some(first));
    assert!(!refresh.is_finished());

    let result = refresh.await.unwrap().unwrap();
    assert!(matches!(result.outcome, SyncOutcome::Refreshed(_)));
    assert!(engine.last_synced_at().unwrap() > first);
}
