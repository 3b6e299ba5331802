//! Front-end router driven in-process with `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use pinbridge_core::DeviceKey;
use pinbridge_hardware::{
    DeviceDirectory, Dispatcher, MockDevice, MockDeviceHandle, UsageStatistics,
};
use pinbridge_network::router;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Fixture {
    app: Router,
    front_door: MockDeviceHandle,
    mux: MockDeviceHandle,
    stats: Arc<UsageStatistics>,
}

fn fixture() -> Fixture {
    let (front_door, front_door_handle) = MockDevice::new(DeviceKey::new("front-door").unwrap());
    let (mux, mux_handle) = MockDevice::new(DeviceKey::new("mux-1").unwrap());
    let directory = DeviceDirectory::from_devices(vec![front_door.into(), mux.into()]).unwrap();
    let stats = Arc::new(UsageStatistics::new());

    Fixture {
        app: router(Dispatcher::new(Arc::new(directory), stats.clone())),
        front_door: front_door_handle,
        mux: mux_handle,
        stats,
    }
}

async fn send(app: &Router, method: Method, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_list_devices_in_directory_order() {
    let f = fixture();
    let (status, body) = send(&f.app, Method::GET, Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": ["front-door", "mux-1"] }));
}

#[tokio::test]
async fn test_post_runs_batch() {
    let f = fixture();
    let request = json!({ "id": "front-door", "commands": ["HOME", "1", "2"] }).to_string();
    let (status, body) = send(&f.app, Method::POST, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    assert_eq!(f.front_door.sent(), vec!["HOME", "1", "2"]);
    assert!(f.mux.sent().is_empty());
    assert_eq!(f.stats.total(), 3);
}

#[tokio::test]
async fn test_malformed_request_is_bad_request() {
    let f = fixture();
    let (status, body) = send(&f.app, Method::POST, r#"{"id": "front-door"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed request"));
    assert_eq!(f.front_door.connects(), 0);
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let f = fixture();
    let request = json!({ "id": "back-door", "commands": ["OPEN"] }).to_string();
    let (status, body) = send(&f.app, Method::POST, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Device not found: back-door" }));
}

#[tokio::test]
async fn test_unreachable_device_is_unavailable() {
    let f = fixture();
    f.mux.set_fail_connect(true);
    let request = json!({ "id": "mux-1", "commands": ["SLOT1"] }).to_string();
    let (status, _body) = send(&f.app, Method::POST, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_rejected_command_names_the_command() {
    let f = fixture();
    f.front_door.reject("OPEN");
    let request = json!({ "id": "front-door", "commands": ["HOME", "OPEN", "5"] }).to_string();
    let (status, body) = send(&f.app, Method::POST, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("OPEN"));
    assert_eq!(f.front_door.sent(), vec!["HOME"]);
    assert_eq!(f.stats.count("front-door", "HOME"), 1);
    assert_eq!(f.stats.count("front-door", "OPEN"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() {
    let f = fixture();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let app = f.app.clone();
            let key = if i % 2 == 0 { "front-door" } else { "mux-1" };
            tokio::spawn(async move {
                let request = json!({ "id": key, "commands": ["A", "B"] }).to_string();
                send(&app, Method::POST, request).await.0
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(f.front_door.sent().len(), 8);
    assert_eq!(f.front_door.max_open_sessions(), 1);
    assert_eq!(f.mux.max_open_sessions(), 1);
    assert_eq!(f.stats.total(), 16);
}

#[tokio::test(start_paused = true)]
async fn test_client_giving_up_does_not_cut_batch_short() {
    let f = fixture();
    f.front_door.set_delay(Duration::from_millis(100));
    let request = json!({ "id": "front-door", "commands": ["A", "B", "C"] }).to_string();

    let gave_up = tokio::time::timeout(
        Duration::from_millis(150),
        send(&f.app, Method::POST, request),
    )
    .await;
    assert!(gave_up.is_err());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(f.front_door.sent(), vec!["A", "B", "C"]);
    assert_eq!(f.front_door.open_sessions(), 0);
    assert_eq!(f.front_door.closes(), 1);
    assert_eq!(f.stats.total(), 3);
}
