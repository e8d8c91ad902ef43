use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, RawQuery, State};
use axum::http::StatusCode as HttpStatus;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use karotz_client::signer::sign;
use karotz_client::{
    Action, ClientConfig, Credentials, Execution, KarotzClient, KarotzError, LedColor, StatusCode,
    TransportError,
};
use percent_encoding::percent_decode_str;

const SECRET: &str = "1929fbe1-54f2-44a7-81c2-80778dbef498";
const TOKEN: &str = "d7c2f6a0-token";

#[derive(Clone, Default)]
struct Device {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Device {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn code(code: &str) -> String {
    format!("<VoosMsg><response><code>{code}</code></response></VoosMsg>")
}

/// Recomputes the signature over the query exactly as received.
async fn start(State(device): State<Device>, RawQuery(query): RawQuery) -> String {
    device.record("start");
    let query = query.unwrap_or_default();
    let Some((signed, signature)) = query.split_once("&signature=") else {
        return code("NO_SIGNATURE");
    };
    let signature = percent_decode_str(signature).decode_utf8_lossy().to_string();
    if sign(SECRET, signed).ok().as_deref() != Some(signature.as_str()) {
        return code("BAD_SIGNATURE");
    }
    format!(
        "<VoosMsg><interactiveMode><action>START</action><interactiveId>{TOKEN}</interactiveId></interactiveMode></VoosMsg>"
    )
}

async fn tts(
    State(device): State<Device>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> String {
    device.record(format!("tts:{}", params.get("text").cloned().unwrap_or_default()));
    if params.get("interactiveid").map(String::as_str) == Some(TOKEN) {
        code("OK")
    } else {
        code("NOT_CONNECTED")
    }
}

async fn interactive_mode(
    State(device): State<Device>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> String {
    device.record(format!(
        "{}:{}",
        params.get("action").cloned().unwrap_or_default(),
        params.get("interactiveid").cloned().unwrap_or_default()
    ));
    code("OK")
}

async fn led(State(device): State<Device>) -> impl IntoResponse {
    device.record("led");
    (HttpStatus::BAD_GATEWAY, "upstream unavailable")
}

async fn ears(State(device): State<Device>) -> String {
    device.record("ears");
    tokio::time::sleep(Duration::from_secs(5)).await;
    code("OK")
}

async fn spawn_device() -> (SocketAddr, Device) {
    let device = Device::default();
    let app = Router::new()
        .route("/api/karotz/start", get(start))
        .route("/api/karotz/tts", get(tts))
        .route("/api/karotz/interactivemode", get(interactive_mode))
        .route("/api/karotz/led", get(led))
        .route("/api/karotz/ears", get(ears))
        .with_state(device.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind device");
    let addr = listener.local_addr().expect("device addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve device");
    });
    (addr, device)
}

fn client_for(addr: SocketAddr, secret: &str) -> KarotzClient {
    let config = ClientConfig {
        base_url: format!("http://{addr}/api"),
        connect_timeout_ms: 1_000,
        request_timeout_ms: 500,
        use_env_proxy: false,
    };
    KarotzClient::with_config(
        Credentials::new("b68bbed3-349f-49d9-976e-8a601abcba26", secret, "36bc42c1"),
        config,
    )
    .expect("client")
}

#[test_timeout::tokio_timeout_test]
async fn signed_session_speaks_and_stops() {
    let (addr, device) = spawn_device().await;
    let client = client_for(addr, SECRET);

    client.start_session().await.expect("start");
    assert_eq!(client.interactive_id().await.as_deref(), Some(TOKEN));

    let outcome = client
        .execute(&Action::speak("Build 42 is back to stable"))
        .await
        .expect("speak");
    assert!(matches!(outcome, Execution::Sent { .. }));

    client.stop_session().await.expect("stop");
    assert!(!client.is_interactive().await);
    assert_eq!(
        device.calls(),
        vec![
            "start".to_string(),
            "tts:Build 42 is back to stable".to_string(),
            format!("stop:{TOKEN}"),
        ]
    );
}

#[test_timeout::tokio_timeout_test]
async fn wrong_secret_is_rejected_by_device() {
    let (addr, _device) = spawn_device().await;
    let client = client_for(addr, "not-the-secret");

    let err = client.start_session().await.unwrap_err();

    assert!(
        matches!(err, KarotzError::SessionStart(StatusCode::Other(ref c)) if c == "BAD_SIGNATURE")
    );
    assert!(!client.is_interactive().await);
}

#[test_timeout::tokio_timeout_test]
async fn http_errors_are_transport_failures() {
    let (addr, _device) = spawn_device().await;
    let client = client_for(addr, SECRET);
    client.start_session().await.expect("start");

    let err = client
        .execute(&Action::light(LedColor::red()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KarotzError::Transport(TransportError::HttpStatus(502))
    ));
    assert!(client.is_interactive().await);
}

#[test_timeout::tokio_timeout_test]
async fn slow_device_times_out() {
    let (addr, _device) = spawn_device().await;
    let client = client_for(addr, SECRET);
    client.start_session().await.expect("start");

    let err = client.execute(&Action::reset_ears()).await.unwrap_err();

    assert!(matches!(
        err,
        KarotzError::Transport(TransportError::Timeout(_))
    ));
}

#[test_timeout::tokio_timeout_test]
async fn unreachable_device_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = client_for(addr, SECRET);

    let err = client.start_session().await.unwrap_err();

    assert!(matches!(err, KarotzError::Transport(_)));
    assert!(!client.is_interactive().await);
}
