//! Postgres repository tests.
//!
//! Run with: `cargo test -p favicon-db --test repository_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use favicon_core::{AppError, FaviconAsset, FaviconStatus};
use favicon_db::FaviconRecordStore;
use helpers::{completed, generated_files, is_recent, setup_test_db};
use uuid::Uuid;

#[tokio::test]
async fn test_recent_processing_is_newest_first_and_limited() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let oldest = db.pending("https://storage.test/siteImages/favicon_1.png", 30).await;
    let newest = db.pending("https://storage.test/siteImages/favicon_3.png", 1).await;
    let middle = db.pending("https://storage.test/siteImages/favicon_2.png", 10).await;
    db.repo
        .upsert_completed(completed("siteImages/favicon_0.png", 1))
        .await
        .unwrap();

    let pending = db.repo.recent_processing(5).await.unwrap();
    let ids: Vec<Uuid> = pending.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newest, middle, oldest]);
    assert!(pending.iter().all(|r| r.status == FaviconStatus::Processing));

    let limited = db.repo.recent_processing(2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, newest);
}

#[tokio::test]
async fn test_claim_completes_once() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let id = db.pending("https://storage.test/siteImages/favicon_1000.png", 0).await;

    let claimed = db
        .repo
        .claim(id, "siteImages/favicon_1000.png#1", &generated_files(1))
        .await
        .unwrap()
        .expect("processing record is claimable");

    assert_eq!(claimed.status, FaviconStatus::Completed);
    assert!(is_recent(claimed.generated_at));
    assert_eq!(claimed.source_object.as_deref(), Some("siteImages/favicon_1000.png#1"));
    let files = claimed.generated_files.expect("files stored with the claim");
    assert_eq!(files.len(), 6);
    assert!(files.get(FaviconAsset::Ico).ends_with("favicon.ico?v=1"));

    let again = db
        .repo
        .claim(id, "siteImages/favicon_1000.png#2", &generated_files(2))
        .await
        .unwrap();
    assert!(again.is_none());

    let stored = db.repo.get(id).await.unwrap().unwrap();
    assert_eq!(stored.generated_files, Some(generated_files(1)));
    assert_eq!(stored.source_object.as_deref(), Some("siteImages/favicon_1000.png#1"));
}

#[tokio::test]
async fn test_claim_with_held_source_object_is_unique_violation() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let first = db.pending("https://storage.test/siteImages/favicon_1.png", 1).await;
    let second = db.pending("https://storage.test/siteImages/favicon_2.png", 0).await;

    db.repo
        .claim(first, "siteImages/favicon_1.png#5", &generated_files(1))
        .await
        .unwrap()
        .unwrap();
    let result = db
        .repo
        .claim(second, "siteImages/favicon_1.png#5", &generated_files(1))
        .await;

    match result {
        Err(AppError::Database(sqlx::Error::Database(e))) => assert!(e.is_unique_violation()),
        other => panic!("expected unique violation, got {:?}", other),
    }
    let untouched = db.repo.get(second).await.unwrap().unwrap();
    assert_eq!(untouched.status, FaviconStatus::Processing);
}

#[tokio::test]
async fn test_upsert_completed_is_keyed_on_source_object() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let created = db
        .repo
        .upsert_completed(completed("siteImages/favicon_1000.png", 1))
        .await
        .unwrap();
    assert_eq!(created.status, FaviconStatus::Completed);
    assert!(!created.is_active);
    assert_eq!(created.size, Some(2048));
    assert_eq!(created.source_url.as_deref(), Some(created.url.as_str()));

    let again = db
        .repo
        .upsert_completed(completed("siteImages/favicon_1000.png", 2))
        .await
        .unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(again.generated_files, Some(generated_files(2)));
    assert_eq!(db.count().await, 1);

    db.repo
        .upsert_completed(completed("siteImages/favicon_1000.png#9", 1))
        .await
        .unwrap();
    assert_eq!(db.count().await, 2);
}

#[tokio::test]
async fn test_upsert_completed_requires_files_and_source() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let mut record = completed("siteImages/favicon_1.png", 1);
    record.generated_files = None;
    let result = db.repo.upsert_completed(record).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert_eq!(db.count().await, 0);
}

#[tokio::test]
async fn test_refresh_only_touches_completed_records() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let pending = db.pending("https://storage.test/siteImages/favicon_1.png", 0).await;
    assert!(db.repo.refresh(pending, &generated_files(3)).await.unwrap().is_none());

    let created = db
        .repo
        .upsert_completed(completed("siteImages/favicon_2.png", 1))
        .await
        .unwrap();
    let refreshed = db
        .repo
        .refresh(created.id, &generated_files(3))
        .await
        .unwrap()
        .expect("completed record is refreshable");
    assert_eq!(refreshed.generated_files, Some(generated_files(3)));
    assert_eq!(refreshed.source_object.as_deref(), Some("siteImages/favicon_2.png"));
}

#[tokio::test]
async fn test_find_by_source_object_and_get() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let created = db
        .repo
        .upsert_completed(completed("siteImages/favicon_7.png#1", 1))
        .await
        .unwrap();

    let found = db
        .repo
        .find_by_source_object("siteImages/favicon_7.png#1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert!(db
        .repo
        .find_by_source_object("siteImages/favicon_7.png#2")
        .await
        .unwrap()
        .is_none());

    assert!(db.repo.get(Uuid::new_v4()).await.unwrap().is_none());
    let fetched = db.repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.filename.as_deref(), Some("favicon_7.png#1"));
}
