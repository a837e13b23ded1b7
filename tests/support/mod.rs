//! Test fixtures: a fake verification service and a relay running on an
//! ephemeral port with its own temp directory.
#![allow(dead_code)]

use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

use face_relay::common::config::RelayConfig;
use face_relay::server::{router, ComparisonCore};

pub const VERIFY_PATH: &str = "/api/v1/verification/verify";
pub const API_KEY: &str = "test-api-key";

/// One multipart part as received by the fake service.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Everything the fake service saw for one call.
#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub api_key: Option<String>,
    pub query: HashMap<String, String>,
    pub parts: Vec<ReceivedPart>,
}

impl ReceivedCall {
    pub fn part(&self, name: &str) -> &ReceivedPart {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("no part named {}", name))
    }
}

struct UpstreamState {
    status: StatusCode,
    body: String,
    calls: Mutex<Vec<ReceivedCall>>,
}

/// Stand-in for the face-verification service with a canned answer.
pub struct FakeUpstream {
    pub url: String,
    state: Arc<UpstreamState>,
}

impl FakeUpstream {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        let state = Arc::new(UpstreamState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            calls: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(VERIFY_PATH, post(verify))
            .with_state(state.clone());
        let addr = spawn(app).await;

        Self {
            url: format!("http://{}{}", addr, VERIFY_PATH),
            state,
        }
    }

    /// A 200 answer whose first match has the given similarity.
    pub async fn with_similarity(similarity: f64) -> Self {
        let body = serde_json::json!({
            "result": [{
                "source_image_face": {"box": {"probability": 0.998}},
                "face_matches": [{"similarity": similarity, "box": {"probability": 0.997}}]
            }]
        });
        Self::start(200, body.to_string()).await
    }

    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.state.calls.lock().unwrap().clone()
    }
}

async fn verify(
    State(state): State<Arc<UpstreamState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    state.calls.lock().unwrap().push(ReceivedCall {
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query,
        parts,
    });

    (state.status, state.body.clone())
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, VERIFY_PATH)
}

/// A relay under test.
pub struct Relay {
    pub base: String,
    pub temp: TempDir,
    http: reqwest::Client,
}

impl Relay {
    /// Start a relay whose normalizer is `program args...`.
    pub async fn start(upstream_url: &str, program: &str, args: &[&str]) -> Self {
        let temp = tempfile::tempdir().unwrap();

        let mut config = RelayConfig::default();
        config.verification.url = upstream_url.to_string();
        config.verification.api_key = API_KEY.to_string();
        config.verification.timeout_secs = 5;
        config.normalizer.program = program.to_string();
        config.normalizer.args = args.iter().map(|a| a.to_string()).collect();
        config.normalizer.timeout_secs = 5;
        config.normalizer.temp_dir = Some(temp.path().to_path_buf());

        let core = ComparisonCore::from_config(&config).unwrap();
        let addr = spawn(router(core, &config.server)).await;

        Self {
            base: format!("http://{}", addr),
            temp,
            http: reqwest::Client::new(),
        }
    }

    /// Start a relay that "normalizes" by copying the input unchanged.
    pub async fn copying(upstream_url: &str) -> Self {
        Self::start(upstream_url, "cp", &["{input}", "{output}"]).await
    }

    pub async fn compare(&self, body: &Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}/compare-faces", self.base))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn post_raw(&self, content_type: &str, body: &'static str) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}/compare-faces", self.base))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    /// Files still present in the relay's temp directory.
    pub fn leftover_files(&self) -> Vec<String> {
        std::fs::read_dir(self.temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
