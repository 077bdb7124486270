#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use tokio::task::JoinHandle;

use eth_gas_window::api::{app_router, AppState};
use eth_gas_window::etherscan::EtherscanClient;

pub const ORACLE_OK: &str = r#"{
    "status": "1",
    "message": "OK",
    "result": {
        "LastBlock": "19800000",
        "SafeGasPrice": "7",
        "ProposeGasPrice": "8",
        "FastGasPrice": "10"
    }
}"#;

pub fn oracle_body(low: f64, average: f64, high: f64) -> String {
    format!(
        r#"{{"status":"1","message":"OK","result":{{"SafeGasPrice":"{}","ProposeGasPrice":"{}","FastGasPrice":"{}"}}}}"#,
        low, average, high
    )
}

/// Stand-in for the Etherscan API; serves whatever body is currently set.
pub struct FakeOracle {
    pub body: Arc<Mutex<String>>,
    next_delay_ms: Arc<AtomicU64>,
    pub url: String,
    handle: JoinHandle<()>,
}

impl FakeOracle {
    pub fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }

    /// Holds back the next response by `ms` milliseconds.
    pub fn delay_next(&self, ms: u64) {
        self.next_delay_ms.store(ms, Ordering::SeqCst);
    }
}

impl Drop for FakeOracle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct OracleState {
    body: Arc<Mutex<String>>,
    next_delay_ms: Arc<AtomicU64>,
}

async fn oracle(State(state): State<OracleState>) -> impl IntoResponse {
    let delay = state.next_delay_ms.swap(0, Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let body = state.body.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, "application/json")], body)
}

pub async fn spawn_oracle(body: &str) -> FakeOracle {
    let state = OracleState {
        body: Arc::new(Mutex::new(body.to_string())),
        next_delay_ms: Arc::new(AtomicU64::new(0)),
    };
    let app = Router::new()
        .route("/api", get(oracle))
        .with_state(state.clone());
    let (addr, handle) = serve(app).await;
    FakeOracle {
        body: state.body,
        next_delay_ms: state.next_delay_ms,
        url: format!("http://{}/api", addr),
        handle,
    }
}

pub struct ProxyApp {
    pub base_url: String,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl Drop for ProxyApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_proxy(upstream_url: &str) -> ProxyApp {
    let upstream = EtherscanClient::new(upstream_url, "test-key", Duration::from_secs(5)).unwrap();
    let state = AppState::new(upstream);
    let (addr, handle) = serve(app_router(state.clone())).await;
    ProxyApp {
        base_url: format!("http://{}", addr),
        state,
        handle,
    }
}

async fn serve(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (addr, handle)
}

pub fn temp_db_url(tag: &str) -> String {
    let dir = std::env::temp_dir();
    let _ = std::fs::create_dir_all(&dir);
    let file = format!(
        "eth_gas_window_test_{}_{}_{}.sqlite",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    );
    let path = dir.join(file);
    format!("sqlite://{}", path.to_string_lossy())
}
