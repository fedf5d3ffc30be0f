//! End-to-end scenarios: operator registry, HTTP service and client together.

use std::sync::Arc;

use permit::client::{CheckRequest, Client, ClientError};
use permit::store::{Keeper, MemoryStore, SqliteStore};
use permit::{Attributes, IssueRequest, PermitKind, Registry};
use permit_testkit::{expired_permit, temp_fs_store, TestFixture};

async fn client_for(fixture: &TestFixture) -> Client {
    let server = fixture.serve().await;
    Client::new(server.base_url).unwrap()
}

#[tokio::test]
async fn issued_permit_passes_check() {
    let fixture = TestFixture::new();
    let registry = Registry::new(fixture.keeper());
    let issued = registry.create(IssueRequest::new("example.com")).await.unwrap();
    assert_eq!(issued.permit.attributes, Attributes::defaults());

    let client = client_for(&fixture).await;
    let permit = client
        .check(&CheckRequest::new(&issued.permit.key, "example.com"))
        .await
        .unwrap();
    assert_eq!(permit, issued.permit);
}

#[tokio::test]
async fn domain_mismatch_leaves_record_untouched() {
    let fixture = TestFixture::new();
    let stored = fixture.issue("example.com").await;
    let client = client_for(&fixture).await;

    let err = client
        .check(&CheckRequest::new(&stored.key, "other.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "domain mismatch"));
    assert_eq!(fixture.store.get(&stored.key).await.unwrap(), stored);
}

#[tokio::test]
async fn expired_permit_is_refused() {
    let fixture = TestFixture::new();
    let stored = fixture.insert(expired_permit("example.com")).await;
    let client = client_for(&fixture).await;

    let err = client
        .check(&CheckRequest::new(&stored.key, "example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "permit not valid"));
}

#[tokio::test]
async fn revoke_and_enable_through_registry() {
    let fixture = TestFixture::new();
    let registry = Registry::new(fixture.keeper());
    let key = registry
        .create(IssueRequest::new("example.com").kind(PermitKind::Infinite))
        .await
        .unwrap()
        .permit
        .key;
    let client = client_for(&fixture).await;
    let request = CheckRequest::new(&key, "example.com");

    registry.revoke(&key).await.unwrap();
    assert!(matches!(
        client.check(&request).await.unwrap_err(),
        ClientError::Unauthorized(_)
    ));

    registry.enable(&key).await.unwrap();
    assert!(client.check(&request).await.unwrap().expires.is_none());
}

/// Race `racers` creates for the same forced key; exactly one may win.
async fn race_forced_key(keeper: Arc<dyn Keeper>, racers: usize) {
    let registry = Registry::new(keeper);
    let mut handles = Vec::new();
    for i in 0..racers {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .create(IssueRequest::new(format!("racer{i}.example.com")).key("contested-key"))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(permit::RegistryError::Store(e)) => assert!(e.is_already_exists(), "{e}"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);

    let stored = registry.get("contested-key").await.unwrap();
    assert!(stored.domain.starts_with("racer"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_forced_key_memory() {
    race_forced_key(Arc::new(MemoryStore::new()), 8).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_forced_key_fs() {
    let (_dir, store) = temp_fs_store();
    race_forced_key(Arc::new(store), 8).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_forced_key_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("permits.db")).unwrap();
    race_forced_key(Arc::new(store), 8).await;
}
