use super::*;

use std::time::Duration;

use ridelink_common::{GeoPoint, Position};
use ridelink_location::PushProvider;
use ridelink_map::TracingSurface;
use ridelink_presence::{MemoryPresenceStore, RemoteValue};

struct Harness {
    handle: SessionHandle,
    task: JoinHandle<()>,
    store: MemoryPresenceStore,
    provider: PushProvider,
    surface: TracingSurface,
}

fn harness_with(store: MemoryPresenceStore, settings: SessionSettings) -> Harness {
    let provider = PushProvider::new();
    provider.set_permission(true);
    let surface = TracingSurface::new();
    let (handle, task) = spawn_session(
        Arc::new(store.clone()),
        Arc::new(provider.clone()),
        surface.clone(),
        settings,
    );
    Harness {
        handle,
        task,
        store,
        provider,
        surface,
    }
}

fn harness() -> Harness {
    harness_with(MemoryPresenceStore::new(), SessionSettings::default())
}

async fn wait_for(handle: &SessionHandle, what: &str, f: impl Fn(&SessionView) -> bool) -> SessionView {
    let mut rx = handle.watch();
    let view = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| f(v)))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("session alive")
        .clone();
    view
}

async fn wait_subscribers(provider: &PushProvider, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while provider.subscriber_count() != n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("location subscriber count never settled");
}

impl Harness {
    /// STARTED with the style loaded and the provider attached.
    async fn activate(&self) {
        self.handle.start().await.unwrap();
        self.handle.style_loaded().await.unwrap();
        wait_subscribers(&self.provider, 1).await;
    }
}

#[tokio::test]
async fn toggle_is_optimistic_and_published() {
    let h = harness();
    h.activate().await;

    h.handle.toggle().await.unwrap();
    let view = wait_for(&h.handle, "connected", |v| v.connected).await;
    assert_eq!(view.presence_version, 1);

    tokio::time::timeout(Duration::from_secs(2), async {
        while h.store.writes().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    let writes = h.store.writes();
    assert!(writes[0].connected);
    assert_eq!(writes[0].version, 1);
}

#[tokio::test]
async fn stale_echo_after_double_toggle_is_ignored() {
    let h = harness();
    h.activate().await;
    h.store.hold_echoes(true);

    h.handle.toggle().await.unwrap();
    h.handle.toggle().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while h.store.writes().len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // Newer echo first, then the echo of the first write arrives last.
    assert!(h.store.release_echo(1));
    assert!(h.store.release_echo(0));

    let view = h.handle.snapshot().await.unwrap();
    assert!(!view.connected);
    assert_eq!(view.presence_version, 2);
}

#[tokio::test]
async fn remote_update_from_other_writer_is_applied() {
    let h = harness();
    h.activate().await;

    h.store.push_remote(RemoteValue {
        connected: true,
        version: None,
    });
    wait_for(&h.handle, "remote connected", |v| v.connected).await;
}

#[tokio::test]
async fn initial_remote_value_is_read_on_first_start() {
    let store = MemoryPresenceStore::with_value(RemoteValue {
        connected: true,
        version: Some(7),
    });
    let h = harness_with(store, SessionSettings::default());
    assert!(!h.handle.view().connected);

    h.handle.start().await.unwrap();
    let view = wait_for(&h.handle, "stored value", |v| v.connected).await;
    assert_eq!(view.presence_version, 7);

    // The next local write outranks the stored version.
    h.handle.toggle().await.unwrap();
    let view = wait_for(&h.handle, "toggle", |v| !v.connected).await;
    assert_eq!(view.presence_version, 8);
}

#[tokio::test]
async fn failed_write_keeps_value_then_next_read_wins() {
    let h = harness();
    h.activate().await;
    h.store
        .fail_writes(Some(PresenceError::WriteFailed("permission denied".into())));

    h.handle.toggle().await.unwrap();
    let view = wait_for(&h.handle, "warning", |v| !v.notices.is_empty()).await;
    assert!(view.connected);
    assert!(view.notices[0].contains("permission denied"));

    h.store.push_remote(RemoteValue {
        connected: false,
        version: None,
    });
    wait_for(&h.handle, "reconciled", |v| !v.connected).await;
}

#[tokio::test]
async fn read_error_keeps_last_value() {
    let h = harness();
    h.activate().await;
    h.store.push_remote(RemoteValue {
        connected: true,
        version: None,
    });
    wait_for(&h.handle, "connected", |v| v.connected).await;

    h.store
        .push_error(PresenceError::ReadFailed("listener cancelled".into()));
    let view = wait_for(&h.handle, "warning", |v| !v.notices.is_empty()).await;
    assert!(view.connected);
}

#[tokio::test]
async fn samples_move_single_marker() {
    let h = harness();
    h.activate().await;

    let base = std::time::Instant::now();
    for i in 0..100u64 {
        let jitter = Duration::from_millis((i * 7919) % 23);
        h.provider.push(Position::new(
            48.85 + i as f64 * 1e-4,
            2.35,
            base + Duration::from_millis(i * 1000) + jitter,
        ));
    }
    let last = GeoPoint::new(48.85 + 99.0 * 1e-4, 2.35);

    wait_for(&h.handle, "last sample", |v| v.marker == Some(last)).await;
    let stats = h.surface.stats();
    assert!(stats.markers_created <= 100);
    assert!(stats.markers_removed <= 99);
    assert_eq!(stats.only_marker(), Some(last));
    assert_eq!(stats.camera.map(|(_, zoom)| zoom), Some(15.0));
}

#[tokio::test]
async fn location_waits_for_style() {
    let h = harness();
    h.handle.start().await.unwrap();
    let view = h.handle.snapshot().await.unwrap();
    assert_eq!(view.lifecycle, SurfaceLifecycleState::Started);
    assert!(!view.style_loaded);
    assert_eq!(h.provider.subscriber_count(), 0);

    h.handle.style_loaded().await.unwrap();
    wait_subscribers(&h.provider, 1).await;
    assert_eq!(h.surface.stats().icons, vec!["user-location-marker".to_string()]);
}

#[tokio::test]
async fn permission_denied_shows_notice_and_leaves_state_alone() {
    let h = harness();
    h.provider.set_permission(false);
    h.handle.start().await.unwrap();
    h.handle.style_loaded().await.unwrap();

    let view = wait_for(&h.handle, "permission notice", |v| v.permission_notice).await;
    assert!(!view.connected);
    assert!(view.marker.is_none());
    assert_eq!(h.provider.subscriber_count(), 0);

    h.handle.toggle().await.unwrap();
    wait_for(&h.handle, "toggle still works", |v| v.connected).await;

    h.handle.dismiss_permission_notice().await.unwrap();
    let view = h.handle.snapshot().await.unwrap();
    assert!(!view.permission_notice);
}

#[tokio::test]
async fn permission_is_requested_again_on_reentry() {
    let h = harness();
    h.provider.set_permission(false);
    h.handle.start().await.unwrap();
    h.handle.style_loaded().await.unwrap();
    wait_for(&h.handle, "permission notice", |v| v.permission_notice).await;

    h.provider.set_permission(true);
    h.handle.stop().await.unwrap();
    h.handle.start().await.unwrap();
    wait_subscribers(&h.provider, 1).await;

    h.provider.push(Position::now(10.0, 10.0));
    wait_for(&h.handle, "marker", |v| v.marker.is_some()).await;
}

#[tokio::test]
async fn stop_start_delivers_nothing_stale_and_keeps_presence() {
    let h = harness();
    h.activate().await;

    h.provider.push(Position::now(1.0, 1.0));
    wait_for(&h.handle, "first marker", |v| v.marker == Some(GeoPoint::new(1.0, 1.0))).await;

    h.provider.push(Position::now(2.0, 2.0));
    h.handle.stop().await.unwrap();
    wait_subscribers(&h.provider, 0).await;
    h.provider.push(Position::now(3.0, 3.0));

    // The presence subscription outlives STOPPED.
    h.store.push_remote(RemoteValue {
        connected: true,
        version: None,
    });
    let view = wait_for(&h.handle, "remote while stopped", |v| v.connected).await;
    assert_eq!(view.lifecycle, SurfaceLifecycleState::Stopped);
    assert_eq!(h.store.subscriber_count(), 1);
    assert_ne!(view.marker, Some(GeoPoint::new(3.0, 3.0)));

    h.handle.start().await.unwrap();
    wait_subscribers(&h.provider, 1).await;
    h.provider.push(Position::now(4.0, 4.0));
    wait_for(&h.handle, "fresh sample", |v| v.marker == Some(GeoPoint::new(4.0, 4.0))).await;
    assert_eq!(h.surface.stats().live_markers.len(), 1);
}

#[tokio::test]
async fn provider_failure_keeps_marker() {
    let h = harness();
    h.activate().await;
    h.provider.push(Position::now(5.0, 5.0));
    wait_for(&h.handle, "marker", |v| v.marker.is_some()).await;

    h.provider.fail(LocationError::ProviderUnavailable("gps off".into()));
    let view = wait_for(&h.handle, "warning", |v| !v.notices.is_empty()).await;
    assert_eq!(view.marker, Some(GeoPoint::new(5.0, 5.0)));
    assert_eq!(h.surface.stats().only_marker(), Some(GeoPoint::new(5.0, 5.0)));
}

#[tokio::test]
async fn destroy_releases_once_and_is_terminal() {
    let h = harness();
    h.activate().await;
    assert_eq!(h.store.subscriber_count(), 1);

    h.handle.destroy().await.unwrap();
    h.handle.destroy().await.unwrap();
    h.handle.start().await.unwrap();

    let view = h.handle.snapshot().await.unwrap();
    assert_eq!(view.lifecycle, SurfaceLifecycleState::Destroyed);
    assert_eq!(h.surface.stats().releases, 1);
    assert_eq!(h.store.subscriber_count(), 0);
    wait_subscribers(&h.provider, 0).await;

    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
    assert_eq!(h.surface.stats().releases, 1);
}

#[tokio::test]
async fn invalid_transition_is_ignored() {
    let h = harness();
    h.handle.stop().await.unwrap();
    let view = h.handle.snapshot().await.unwrap();
    assert_eq!(view.lifecycle, SurfaceLifecycleState::Created);
    assert_eq!(h.store.subscriber_count(), 0);
}

#[tokio::test]
async fn probe_runs_on_first_activation_only() {
    let h = harness();
    h.handle.start().await.unwrap();
    h.handle.stop().await.unwrap();
    h.handle.start().await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while h.store.probes().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    h.handle.snapshot().await.unwrap();
    assert_eq!(
        h.store.probes(),
        vec![("test_message".to_string(), "Hello from ridelink".to_string())]
    );
}

#[tokio::test]
async fn empty_probe_path_disables_probe() {
    let settings = SessionSettings {
        probe_path: String::new(),
        ..SessionSettings::default()
    };
    let h = harness_with(MemoryPresenceStore::new(), settings);
    h.handle.start().await.unwrap();
    h.handle.snapshot().await.unwrap();
    tokio::task::yield_now().await;
    assert!(h.store.probes().is_empty());
}

#[tokio::test]
async fn events_are_published_on_the_bus() {
    let h = harness();
    let mut events = h.handle.events();
    h.handle.start().await.unwrap();
    h.handle.toggle().await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        first,
        DriverEvent::LifecycleChanged(SurfaceLifecycleState::Started)
    ));
    let second = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        second,
        DriverEvent::PresenceChanged {
            connected: true,
            version: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn shutdown_ends_the_task() {
    let h = harness();
    let mut events = h.handle.events();
    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
    assert!(matches!(events.recv().await, Ok(DriverEvent::Shutdown)));
    assert!(h.handle.toggle().await.is_err());
    assert!(h.surface.is_released());
}
