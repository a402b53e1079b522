#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use careflow_api::app::{app, AppState};
use careflow_api::auth::{generate_jwt, Claims};
use careflow_api::config;
use careflow_api::database::{Fixture, MemoryStore};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";
const DEMO: &str = include_str!("../../fixtures/demo.yaml");

pub const RINGWOOD: &str = "0b0c3a52-6f0e-4c39-9b1f-5a2f1d1e9a01";
pub const ASHDOWN: &str = "0b0c3a52-6f0e-4c39-9b1f-5a2f1d1e9a02";
pub const CLOSED: &str = "0b0c3a52-6f0e-4c39-9b1f-5a2f1d1e9a03";
pub const ADMIN_USER: &str = "5f1a2b3c-0000-4000-8000-00000000a001";

pub fn staff(n: u8) -> String {
    format!("9c1e0000-0000-4000-8000-00000000e{:03}", n)
}

/// In-process server over a fresh demo-seeded memory store
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let fixture = Fixture::from_yaml(DEMO).context("demo fixture should parse")?;
        let store = Arc::new(MemoryStore::new(fixture));
        let state = AppState::new(store.clone(), TEST_SECRET);
        let router = app(state, config::config());

        // Port 0 lets the OS pick a free port for each test
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            store,
            client: reqwest::Client::new(),
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get_as(&self, user: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token_for(user))
    }

    pub fn post_as(&self, user: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token_for(user))
    }
}

pub fn token_for(user: &str) -> String {
    let user_id = Uuid::parse_str(user).expect("test user ids are uuids");
    generate_jwt(&Claims::new(user_id, None, 1), TEST_SECRET).expect("token should sign")
}

pub fn new_user() -> String {
    Uuid::new_v4().to_string()
}
