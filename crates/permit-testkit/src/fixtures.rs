//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use permit_api::{build_router, ApiConfig, AppState};
use permit_core::{issue, IssueRequest, Permit, PermitKind};
use permit_store::{FsStore, Keeper, MemoryStore};
use tempfile::TempDir;

/// Secret used by [`TestFixture::serve`] unless a test picks its own.
pub const TEST_JWT_SECRET: &str = "test-secret";

/// A test fixture around an in-memory store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with an empty store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// The store as the trait object handlers take.
    pub fn keeper(&self) -> Arc<dyn Keeper> {
        self.store.clone()
    }

    /// Issue a standard permit for `domain` and store it.
    pub async fn issue(&self, domain: &str) -> Permit {
        self.insert(make_permit(domain)).await
    }

    /// Store `permit` as is.
    pub async fn insert(&self, permit: Permit) -> Permit {
        self.store.create(&permit).await.expect("fixture permit should store");
        permit
    }

    /// Serve the store over HTTP with [`TEST_JWT_SECRET`].
    pub async fn serve(&self) -> TestServer {
        spawn_server(self.keeper(), ApiConfig::new(TEST_JWT_SECRET)).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A standard permit for `domain`, not stored anywhere.
pub fn make_permit(domain: &str) -> Permit {
    issue(IssueRequest::new(domain).kind(PermitKind::Standard), Utc::now())
        .expect("fixture domain should be valid")
        .permit
}

/// A permit for `domain` whose expiry passed one second ago.
pub fn expired_permit(domain: &str) -> Permit {
    let mut permit = make_permit(domain);
    permit.expires = Some(Utc::now() - Duration::seconds(1));
    permit
}

/// A filesystem store in a fresh temp directory. Keep the `TempDir` alive
/// for as long as the store is used.
pub fn temp_fs_store() -> (TempDir, FsStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FsStore::open(dir.path()).expect("open fs store");
    (dir, store)
}

/// HS256 bearer token for `secret` with an expiry an hour out.
pub fn bearer_token(secret: &str) -> String {
    let claims = serde_json::json!({
        "sub": "testkit",
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token should encode")
}

/// A running API server.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Spin up the HTTP server on an OS-assigned port.
pub async fn spawn_server(keeper: Arc<dyn Keeper>, config: ApiConfig) -> TestServer {
    let app = build_router(AppState::new(keeper, &config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server failed");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        addr,
    }
}
