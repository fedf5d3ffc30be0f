use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use permit_api::{ApiConfig, ErrorBody};
use permit_core::{Attributes, Mutation, Permit, KEY_LENGTH};
use permit_store::{Keeper, ListQuery, StoreError};
use permit_testkit::fixtures::TEST_JWT_SECRET;
use permit_testkit::{bearer_token, expired_permit, make_permit, spawn_server, TestFixture};
use serde_json::json;

async fn post_check(url: &str, key: &str, domain: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .json(&json!({ "key": key, "domain": domain }))
        .send()
        .await
        .unwrap()
}

async fn error_message(resp: reqwest::Response) -> String {
    resp.json::<ErrorBody>().await.unwrap().error
}

#[tokio::test]
async fn check_returns_stored_permit() {
    let fixture = TestFixture::new();
    let permit = fixture.issue("example.com").await;
    let server = fixture.serve().await;

    let resp = post_check(&server.url("/check"), &permit.key, "example.com").await;
    assert_eq!(resp.status(), 200);

    let expires = resp.headers().get("expires").unwrap().to_str().unwrap().to_string();
    assert!(expires.ends_with(" GMT"));

    let body: Permit = resp.json().await.unwrap();
    assert_eq!(body, permit);
}

#[tokio::test]
async fn check_without_expiry_has_no_expires_header() {
    let fixture = TestFixture::new();
    let mut permit = make_permit("example.com");
    permit.expires = None;
    fixture.insert(permit.clone()).await;
    let server = fixture.serve().await;

    let resp = post_check(&server.url("/check"), &permit.key, "example.com").await;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("expires").is_none());
}

#[tokio::test]
async fn check_domain_mismatch_is_unauthorized() {
    let fixture = TestFixture::new();
    let permit = fixture.issue("example.com").await;
    let server = fixture.serve().await;

    let resp = post_check(&server.url("/check"), &permit.key, "other.com").await;
    assert_eq!(resp.status(), 401);
    assert_eq!(error_message(resp).await, "domain mismatch");

    assert_eq!(fixture.store.get(&permit.key).await.unwrap(), permit);
}

#[tokio::test]
async fn check_expired_permit_is_unauthorized() {
    let fixture = TestFixture::new();
    let permit = fixture.insert(expired_permit("example.com")).await;
    let server = fixture.serve().await;

    let resp = post_check(&server.url("/check"), &permit.key, "example.com").await;
    assert_eq!(resp.status(), 401);
    assert_eq!(error_message(resp).await, "permit not valid");
}

#[tokio::test]
async fn check_revoked_permit_is_unauthorized() {
    let fixture = TestFixture::new();
    let permit = fixture.issue("example.com").await;
    fixture.store.revoke(&permit.key).await.unwrap();
    let server = fixture.serve().await;

    let resp = post_check(&server.url("/check"), &permit.key, "example.com").await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn check_unknown_key_is_not_found() {
    let server = TestFixture::new().serve().await;

    let resp = post_check(&server.url("/check"), &"x".repeat(KEY_LENGTH), "example.com").await;
    assert_eq!(resp.status(), 404);
    assert_eq!(error_message(resp).await, "permit not found");
}

#[tokio::test]
async fn check_rejects_bad_input() {
    let server = TestFixture::new().serve().await;
    let url = server.url("/check");

    let resp = reqwest::Client::new().post(&url).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    assert!(error_message(resp).await.starts_with("could not decode request"));

    let resp = post_check(&url, "abc", "example.com").await;
    assert_eq!(resp.status(), 400);

    let resp = post_check(&url, "abcdef", &format!("{}.com", "a".repeat(100))).await;
    assert_eq!(resp.status(), 400);

    let resp = post_check(&url, "abcdef", "not_a_domain").await;
    assert_eq!(resp.status(), 400);
    assert_eq!(error_message(resp).await, "invalid domain");
}

#[tokio::test]
async fn check_ignores_requested_attributes() {
    let fixture = TestFixture::new();
    let permit = fixture.issue("example.com").await;
    let server = fixture.serve().await;

    let resp = reqwest::Client::new()
        .post(server.url("/check"))
        .json(&json!({
            "key": permit.key,
            "domain": "example.com",
            "attributes": { "system.max-users": 99999 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Permit = resp.json().await.unwrap();
    assert_eq!(body.attributes, Attributes::defaults());
}

#[tokio::test]
async fn check_is_rate_limited() {
    let config = ApiConfig::new(TEST_JWT_SECRET).check_requests_per_hour(NonZeroU32::new(2).unwrap());
    let server = spawn_server(TestFixture::new().keeper(), config).await;
    let url = server.url("/check");

    for _ in 0..2 {
        let resp = post_check(&url, "abcdef", "example.com").await;
        assert_eq!(resp.status(), 404);
    }

    let resp = post_check(&url, "abcdef", "example.com").await;
    assert_eq!(resp.status(), 429);
    let retry_after: u64 = resp.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1);
}

#[tokio::test]
async fn create_requires_bearer_token() {
    let fixture = TestFixture::new();
    let server = fixture.serve().await;
    let client = reqwest::Client::new();
    let body = json!({ "domain": "example.com" });

    let resp = client.post(server.url("/key")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(server.url("/key"))
        .bearer_auth(bearer_token("wrong-secret"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error_message(resp).await, "invalid bearer token");

    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn create_fills_default_attributes() {
    let fixture = TestFixture::new();
    let server = fixture.serve().await;

    let resp = reqwest::Client::new()
        .post(server.url("/key"))
        .bearer_auth(bearer_token(TEST_JWT_SECRET))
        .json(&json!({ "domain": "example.com", "contact": "ops@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let permit: Permit = resp.json().await.unwrap();
    assert_eq!(permit.key.len(), KEY_LENGTH);
    assert_eq!(permit.domain, "example.com");
    assert_eq!(permit.contact, "ops@example.com");
    assert_eq!(permit.attributes, Attributes::defaults());
    assert!(permit.valid);
    assert!(permit.expires.is_some());

    assert_eq!(fixture.store.get(&permit.key).await.unwrap(), permit);
}

#[tokio::test]
async fn create_merges_known_overrides_only() {
    let fixture = TestFixture::new();
    let server = fixture.serve().await;

    let resp = reqwest::Client::new()
        .post(server.url("/key"))
        .bearer_auth(bearer_token(TEST_JWT_SECRET))
        .json(&json!({
            "domain": "example.com",
            "type": "infinite",
            "attributes": { "system.max-users": 25, "made.up": 7 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let permit: Permit = resp.json().await.unwrap();
    assert_eq!(permit.expires, None);
    assert_eq!(permit.attributes.get("system.max-users"), Some(25));
    assert_eq!(permit.attributes.get("made.up"), None);
    assert_eq!(permit.attributes.len(), Attributes::defaults().len());
}

#[tokio::test]
async fn create_rejects_invalid_domain_and_type() {
    let server = TestFixture::new().serve().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "domain": "localhost" }),
        json!({ "domain": "example.com", "type": "forever" }),
        json!({ "domain": "example.com", "attributes": { "system.max-users": -5 } }),
    ] {
        let resp = client
            .post(server.url("/key"))
            .bearer_auth(bearer_token(TEST_JWT_SECRET))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body: {body}");
    }
}

#[tokio::test]
async fn unknown_path_serves_landing_page() {
    let server = TestFixture::new().serve().await;

    let resp = reqwest::get(server.url("/anything/else")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(resp.text().await.unwrap().contains("Permit server"));
}

#[tokio::test]
async fn created_permit_passes_check() {
    let fixture = TestFixture::new();
    let server = fixture.serve().await;
    let client = reqwest::Client::new();

    let attributes: BTreeMap<&str, i64> = [("compose.max-pages", 3)].into_iter().collect();
    let created: Permit = client
        .post(server.url("/key"))
        .bearer_auth(bearer_token(TEST_JWT_SECRET))
        .json(&json!({ "domain": "shop.example.com", "type": "trial", "attributes": attributes }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = post_check(&server.url("/check"), &created.key, "shop.example.com").await;
    assert_eq!(resp.status(), 200);
    let checked: Permit = resp.json().await.unwrap();
    assert_eq!(checked, created);
    assert_eq!(checked.attributes.get("compose.max-pages"), Some(3));
}

/// A keeper whose address space is always taken.
#[derive(Default)]
struct CollidingKeeper {
    creates: AtomicUsize,
}

#[async_trait]
impl Keeper for CollidingKeeper {
    async fn list(&self, _query: &ListQuery) -> permit_store::Result<Vec<Permit>> {
        Ok(Vec::new())
    }

    async fn get(&self, key: &str) -> permit_store::Result<Permit> {
        Err(StoreError::NotFound {
            address: permit_core::StorageAddress::derive(key),
        })
    }

    async fn create(&self, permit: &Permit) -> permit_store::Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::AlreadyExists {
            address: permit.address(),
        })
    }

    async fn update(&self, key: &str, _mutation: Mutation) -> permit_store::Result<()> {
        self.get(key).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> permit_store::Result<()> {
        self.get(key).await.map(|_| ())
    }
}

#[tokio::test]
async fn create_collision_is_internal_error_without_retry() {
    let keeper = Arc::new(CollidingKeeper::default());
    let server = spawn_server(keeper.clone(), ApiConfig::new(TEST_JWT_SECRET)).await;

    let resp = reqwest::Client::new()
        .post(server.url("/key"))
        .bearer_auth(bearer_token(TEST_JWT_SECRET))
        .json(&json!({ "domain": "example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(error_message(resp).await, "could not store permit");
    assert_eq!(keeper.creates.load(Ordering::SeqCst), 1);
}
