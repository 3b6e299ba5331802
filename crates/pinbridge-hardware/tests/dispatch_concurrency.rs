//! Concurrency and release guarantees of the dispatcher.
//!
//! Timing tests run on a paused clock: the mock device sleeps per command,
//! and the runtime auto-advances time, so elapsed times are exact.

use pinbridge_core::DeviceKey;
use pinbridge_hardware::{
    DeviceDirectory, DispatchError, Dispatcher, MockDevice, MockDeviceHandle, UsageStatistics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const COMMAND_DELAY: Duration = Duration::from_millis(100);

struct Fixture {
    dispatcher: Dispatcher,
    handles: Vec<MockDeviceHandle>,
    stats: Arc<UsageStatistics>,
}

fn fixture(keys: &[&str]) -> Fixture {
    let mut devices = Vec::new();
    let mut handles = Vec::new();
    for key in keys {
        let (device, handle) = MockDevice::new(DeviceKey::new(key).unwrap());
        handle.set_delay(COMMAND_DELAY);
        devices.push(device.into());
        handles.push(handle);
    }

    let stats = Arc::new(UsageStatistics::new());
    let directory = DeviceDirectory::from_devices(devices).unwrap();
    Fixture {
        dispatcher: Dispatcher::new(Arc::new(directory), stats.clone()),
        handles,
        stats,
    }
}

fn spawn_batch(
    dispatcher: &Dispatcher,
    key: &'static str,
    commands: Vec<String>,
) -> tokio::task::JoinHandle<Result<(), DispatchError>> {
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move { dispatcher.execute(key, &commands).await })
}

fn batch(prefix: &str, len: usize) -> Vec<String> {
    (0..len).map(|i| format!("{prefix}{i}")).collect()
}

#[tokio::test(start_paused = true)]
async fn test_different_devices_run_in_parallel() {
    let f = fixture(&["front-door", "back-door"]);
    let start = Instant::now();

    let a = spawn_batch(&f.dispatcher, "front-door", batch("A", 2));
    let b = spawn_batch(&f.dispatcher, "back-door", batch("B", 2));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(start.elapsed(), 2 * COMMAND_DELAY);
    assert_eq!(f.handles[0].sent(), batch("A", 2));
    assert_eq!(f.handles[1].sent(), batch("B", 2));
}

#[tokio::test(start_paused = true)]
async fn test_same_device_batches_are_serialized() {
    let f = fixture(&["front-door"]);
    let start = Instant::now();

    let a = spawn_batch(&f.dispatcher, "front-door", batch("A", 2));
    let b = spawn_batch(&f.dispatcher, "front-door", batch("B", 2));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(start.elapsed(), 4 * COMMAND_DELAY);
    assert_eq!(f.handles[0].max_open_sessions(), 1);
    assert_eq!(f.handles[0].connects(), 2);
    assert_eq!(f.handles[0].closes(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batches_never_interleave() {
    let f = fixture(&["front-door"]);
    let prefixes = ["A", "B", "C", "D", "E", "F"];

    let tasks: Vec<_> = prefixes
        .iter()
        .map(|p| spawn_batch(&f.dispatcher, "front-door", batch(p, 3)))
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let sent = f.handles[0].sent();
    assert_eq!(sent.len(), prefixes.len() * 3);

    // Each run of three commands belongs to one batch, in order
    for chunk in sent.chunks(3) {
        let prefix = &chunk[0][..1];
        assert_eq!(chunk.to_vec(), batch(prefix, 3));
    }
    assert_eq!(f.handles[0].max_open_sessions(), 1);
    assert_eq!(f.stats.total(), 18);
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_releases_device_for_next_request() {
    let f = fixture(&["front-door"]);
    f.handles[0].reject("A1");

    let a = spawn_batch(&f.dispatcher, "front-door", batch("A", 3));
    let b = spawn_batch(&f.dispatcher, "front-door", batch("B", 2));

    let err = a.await.unwrap().unwrap_err();
    assert_eq!(err.command(), Some("A1"));
    b.await.unwrap().unwrap();

    let mut sent = f.handles[0].sent();
    sent.sort();
    assert_eq!(sent, vec!["A0", "B0", "B1"]);
    assert_eq!(f.handles[0].open_sessions(), 0);
    assert!(!f.dispatcher.directory().get("front-door").unwrap().is_held());
}

#[tokio::test(start_paused = true)]
async fn test_slow_device_does_not_block_others() {
    let f = fixture(&["front-door", "back-door"]);
    f.handles[0].set_delay(Duration::from_secs(60));

    let slow = spawn_batch(&f.dispatcher, "front-door", batch("S", 1));
    tokio::task::yield_now().await;

    let start = Instant::now();
    f.dispatcher
        .execute("back-door", &batch("B", 1))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), COMMAND_DELAY);

    slow.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_front_door_scenario() {
    let (device, handle) = MockDevice::new(DeviceKey::new("front-door").unwrap());
    handle.reject("OPEN");
    let stats = Arc::new(UsageStatistics::new());
    let directory = DeviceDirectory::from_devices(vec![device.into()]).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(directory), stats.clone());

    let err = dispatcher
        .execute("front-door", &["HOME", "OPEN"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Input { ref command, .. } if command == "OPEN"
    ));
    assert_eq!(stats.count("front-door", "HOME"), 1);
    assert_eq!(stats.count("front-door", "OPEN"), 0);
    assert_eq!(handle.connects(), 1);
    assert_eq!(handle.closes(), 1);
}

#[tokio::test]
async fn test_unreachable_device_reports_connection_error() {
    let f = fixture(&["mux-1"]);
    f.handles[0].set_reachable(false);

    let err = f.dispatcher.execute("mux-1", &["SLOT1"]).await.unwrap_err();
    assert!(matches!(err, DispatchError::Connection { ref key, .. } if key == "mux-1"));
    assert_eq!(f.handles[0].open_sessions(), 0);
    assert_eq!(f.dispatcher.directory().get("mux-1").unwrap().acquisitions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_batch_still_closes_device() {
    let f = fixture(&["front-door"]);

    let a = spawn_batch(&f.dispatcher, "front-door", batch("A", 3));
    tokio::time::sleep(COMMAND_DELAY + COMMAND_DELAY / 2).await;
    a.abort();
    assert!(a.await.unwrap_err().is_cancelled());

    // The next batch waits for the background close, then gets a fresh session
    f.dispatcher
        .execute("front-door", &batch("B", 1))
        .await
        .unwrap();

    assert_eq!(f.handles[0].sent(), vec!["A0", "B0"]);
    assert_eq!(f.handles[0].open_sessions(), 0);
    assert_eq!(f.handles[0].max_open_sessions(), 1);
    assert_eq!(f.handles[0].closes(), 2);
    assert!(!f.dispatcher.directory().get("front-door").unwrap().is_held());
}
