//! HttpTransport round-trips against a real local server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use natter_client::transport::{HttpTransport, Transport};
use natter_client::{ClientConfig, Credentials};

/// What the handlers saw: (authorization header, full request uri).
type Seen = Arc<Mutex<Vec<(Option<String>, String)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base: &str) -> ClientConfig {
    ClientConfig {
        api_base: base.to_string(),
        ..ClientConfig::default()
    }
}

fn credentials() -> Credentials {
    Credentials {
        login: "ana".into(),
        password: "s3cret".into(),
    }
}

async fn record(State(seen): State<Seen>, headers: HeaderMap, uri: Uri) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.lock().unwrap().push((auth, uri.to_string()));
    Json(json!({"messages": []}))
}

#[tokio::test]
async fn get_sends_basic_auth_and_query() {
    let seen: Seen = Seen::default();
    let app = Router::new()
        .route("/api/live.json", get(record))
        .with_state(seen.clone());
    let base = serve(app).await;

    let transport = HttpTransport::for_live(&config(&base), Some(&credentials())).unwrap();
    let body = transport
        .get_json("/api/live.json", &[("cursor", "4d9b4bf1")])
        .await
        .unwrap();

    assert_eq!(body, json!({"messages": []}));
    let seen = seen.lock().unwrap();
    let (auth, uri) = &seen[0];
    // base64("ana:s3cret")
    assert_eq!(auth.as_deref(), Some("Basic YW5hOnMzY3JldA=="));
    assert_eq!(uri, "/api/live.json?cursor=4d9b4bf1");
}

#[tokio::test]
async fn post_form_encodes_the_message_body() {
    let received: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
    let state = received.clone();
    let app = Router::new().route(
        "/api/topics/7/messages/create.json",
        post(move |Form(form): Form<HashMap<String, String>>| async move {
            state.lock().unwrap().push(form);
            Json(json!({"message": {"id": 1}}))
        }),
    );
    let base = serve(app).await;

    let transport = HttpTransport::for_commands(&config(&base), Some(&credentials())).unwrap();
    transport
        .post_form(
            "/api/topics/7/messages/create.json",
            &[("message", "hello world & more")],
        )
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received[0]["message"], "hello world & more");
}

#[tokio::test]
async fn non_2xx_maps_to_a_status_error() {
    let app = Router::new().route(
        "/api/groups.json",
        get(|| async { (StatusCode::UNAUTHORIZED, "go away") }),
    );
    let base = serve(app).await;

    let transport = HttpTransport::for_commands(&config(&base), None).unwrap();
    let err = transport.get_json("/api/groups.json", &[]).await.unwrap_err();
    match err {
        natter_client::NetworkError::Status { status, .. } => assert_eq!(status, 401),
        other => panic!("expected a status error, got {other}"),
    }
}

#[tokio::test]
async fn non_json_body_maps_to_a_bad_body_error() {
    let app = Router::new().route(
        "/api/groups.json",
        get(|| async { "<html>maintenance</html>" }),
    );
    let base = serve(app).await;

    let transport = HttpTransport::for_commands(&config(&base), None).unwrap();
    let err = transport.get_json("/api/groups.json", &[]).await.unwrap_err();
    match err {
        natter_client::NetworkError::BadBody(body) => {
            assert!(body.contains("maintenance"))
        }
        other => panic!("expected a bad-body error, got {other}"),
    }
}

#[tokio::test]
async fn refused_connection_maps_to_a_connect_error() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport =
        HttpTransport::for_commands(&config(&format!("http://{addr}")), None).unwrap();
    let err = transport.get_json("/api/groups.json", &[]).await.unwrap_err();
    assert!(matches!(err, natter_client::NetworkError::Connect(_)));
}
