use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use nugetfind_core::config::Config;
use nugetfind_core::fetcher::{FetchError, Fetcher, HttpSearchBackend, SearchBackend};
use nugetfind_core::model::Query;
use nugetfind_core::page::Page;

const SERILOG: &str = r#"{"totalHits":1,"data":[{"id":"Serilog","version":"4.0.0","iconUrl":"https://example.test/serilog.png"}]}"#;

#[derive(Clone, Copy)]
enum ServerMode {
    Respond(&'static str),
    Status(StatusCode),
    DelayResponse { millis: u64 },
}

#[derive(Clone)]
struct ServerState {
    mode: ServerMode,
    seen: Arc<Mutex<Vec<String>>>,
}

async fn query_handler(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, &'static str) {
    state.seen.lock().unwrap().push(query.unwrap_or_default());
    match state.mode {
        ServerMode::Respond(body) => (StatusCode::OK, body),
        ServerMode::Status(status) => (status, "unavailable"),
        ServerMode::DelayResponse { millis } => {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            (StatusCode::OK, SERILOG)
        }
    }
}

struct TestServer {
    endpoint: String,
    seen: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

async fn start_test_server(mode: ServerMode) -> TestServer {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/query", get(query_handler))
        .with_state(ServerState {
            mode,
            seen: Arc::clone(&seen),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test server");
    });

    TestServer {
        endpoint: format!("http://{addr}/query"),
        seen,
    }
}

fn backend_for(endpoint: &str, page: Page) -> HttpSearchBackend {
    let cfg = Config {
        endpoint: endpoint.to_string(),
        ..Config::default()
    };
    HttpSearchBackend::new(&cfg, page).expect("build http client")
}

#[tokio::test]
async fn search_sends_encoded_query_and_parses_records() {
    let server = start_test_server(ServerMode::Respond(SERILOG)).await;
    let backend = backend_for(&server.endpoint, Page::Packages);

    let records = backend
        .search(&Query::new("serilog sinks&file", 1))
        .await
        .expect("search should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("Serilog"));
    assert_eq!(records[0].version.as_deref(), Some("4.0.0"));
    assert_eq!(
        records[0].icon_url.as_deref(),
        Some("https://example.test/serilog.png")
    );
    assert_eq!(server.seen(), vec!["take=20&q=serilog%20sinks%26file"]);
}

#[tokio::test]
async fn tools_page_filters_by_package_type() {
    let server = start_test_server(ServerMode::Respond(r#"{"data":[]}"#)).await;
    let backend = backend_for(&server.endpoint, Page::DotnetTools);

    let records = backend.search(&Query::new("ef", 1)).await.unwrap();

    assert!(records.is_empty());
    assert_eq!(server.seen(), vec!["take=20&packageType=DotnetTool&q=ef"]);
}

#[tokio::test]
async fn missing_data_field_is_empty_result() {
    let server = start_test_server(ServerMode::Respond(r#"{"totalHits":0}"#)).await;
    let backend = backend_for(&server.endpoint, Page::Packages);

    let records = backend.search(&Query::new("nothing", 1)).await.unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn non_success_status_is_remote_error() {
    let server = start_test_server(ServerMode::Status(StatusCode::SERVICE_UNAVAILABLE)).await;
    let backend = backend_for(&server.endpoint, Page::Packages);

    let outcome = backend.search(&Query::new("serilog", 1)).await;

    assert_eq!(outcome, Err(FetchError::Remote(503)));
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("listener addr");
    drop(listener);

    let backend =
        HttpSearchBackend::with_client(Client::new(), &format!("http://{addr}/query"), 20, None);
    let outcome = backend.search(&Query::new("serilog", 1)).await;

    assert!(matches!(outcome, Err(FetchError::Network(_))));
}

#[tokio::test]
async fn request_timeout_is_network_error() {
    let server = start_test_server(ServerMode::DelayResponse { millis: 2_000 }).await;
    let cfg = Config {
        endpoint: server.endpoint.clone(),
        request_timeout_ms: 100,
        ..Config::default()
    };
    let backend = HttpSearchBackend::new(&cfg, Page::Packages).unwrap();

    let outcome = backend.search(&Query::new("slow", 1)).await;

    assert!(matches!(outcome, Err(FetchError::Network(_))));
}

#[tokio::test]
async fn cancelling_scope_abandons_slow_request() {
    let server = start_test_server(ServerMode::DelayResponse { millis: 5_000 }).await;
    let mut fetcher = Fetcher::new(Arc::new(backend_for(&server.endpoint, Page::Packages)));
    let scope = CancellationToken::new();

    let canceller = {
        let scope = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            scope.cancel();
        })
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        fetcher.fetch(&Query::new("slow", 1), &scope),
    )
    .await
    .expect("cancellation should end the fetch promptly");

    assert_eq!(outcome, Err(FetchError::Cancelled));
    canceller.await.unwrap();
}
