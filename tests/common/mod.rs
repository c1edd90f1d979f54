//! Shared integration-test harness: scripted joke providers, a fake joke
//! API served by axum, and helpers for running the `punchline` binary.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::net::SocketAddr;
use std::process::Output;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;

use punchline::error::JokeFetchError;
use punchline::joke::{Joke, JokeProvider};

// ============================================================================
// Scripted provider
// ============================================================================

/// Provider that replays a fixed script of results, one per call, after an
/// optional delay. Calls beyond the script fail with `Exhausted`.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Joke, JokeFetchError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Joke, JokeFetchError>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Vec<Result<Joke, JokeFetchError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// Always succeeds with `{general, S, P, 1}`.
    pub fn single() -> Arc<Self> {
        Self::new(vec![Ok(sample_joke())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JokeProvider for ScriptedProvider {
    async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(JokeFetchError::Exhausted))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// The canonical test joke.
pub fn sample_joke() -> Joke {
    Joke::new("general", "S", "P", 1)
}

// ============================================================================
// Fake joke API
// ============================================================================

/// A fake random-joke API on an ephemeral loopback port.
///
/// Routes:
/// - `/random_joke`: a fresh joke on every call, ids counting up from 1
/// - `/broken`: HTTP 500
/// - `/garbage`: 200 with a non-JSON body
/// - `/blank`: 200 with a blank punchline
/// - `/huge`: 200 with a body over 64 KiB
/// - `/slow`: answers after two seconds
///
/// The server task is aborted on drop.
pub struct FakeJokeApi {
    addr: SocketAddr,
    hits: Arc<AtomicI64>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeJokeApi {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicI64::new(0));
        let app = Router::new()
            .route("/random_joke", get(random_joke))
            .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/garbage", get(|| async { "<html>definitely not json</html>" }))
            .route(
                "/blank",
                get(|| async {
                    axum::Json(json!({"type": "general", "setup": "S", "punchline": " ", "id": 9}))
                }),
            )
            .route("/huge", get(|| async { "x".repeat(70 * 1024) }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    axum::Json(json!({"type": "general", "setup": "S", "punchline": "P", "id": 1}))
                }),
            )
            .with_state(Arc::clone(&hits));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake joke API");
        let addr = listener.local_addr().expect("no local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, hits, handle }
    }

    /// Full URL for a route, e.g. `url("/random_joke")`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Number of `/random_joke` requests served.
    pub fn hits(&self) -> i64 {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for FakeJokeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn random_joke(State(hits): State<Arc<AtomicI64>>) -> impl IntoResponse {
    let id = hits.fetch_add(1, Ordering::SeqCst) + 1;
    axum::Json(json!({
        "type": "general",
        "setup": format!("Setup number {id}"),
        "punchline": format!("Punchline number {id}"),
        "id": id,
        "extra": "ignored",
    }))
}

// ============================================================================
// Binary helpers
// ============================================================================

/// Runs the `punchline` binary to completion with stdin closed.
pub async fn punchline(args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_punchline"))
        .args(args)
        .env_remove("PUNCHLINE_CONFIG")
        .env_remove("PUNCHLINE_ENDPOINT")
        .env("PUNCHLINE_LOG_LEVEL", "warn")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .expect("failed to run punchline")
}

/// Blocking variant for tests that need no fake server.
pub fn punchline_blocking(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_punchline"))
        .args(args)
        .env_remove("PUNCHLINE_CONFIG")
        .env_remove("PUNCHLINE_ENDPOINT")
        .env("PUNCHLINE_LOG_LEVEL", "warn")
        .stdin(std::process::Stdio::null())
        .output()
        .expect("failed to run punchline")
}

/// Writes a temporary YAML config file.
pub fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

/// A config with reveal timings short enough for end-to-end runs.
pub const FAST_TIMINGS: &str = "\
timings:
  summon_delay: 20ms
  setup_hold: 20ms
  suspense_hold: 20ms
";
