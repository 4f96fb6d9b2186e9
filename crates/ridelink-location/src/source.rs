//! Activation of a location provider with stale-delivery protection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use ridelink_common::{LocationError, Position};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::provider::{LocationProvider, PositionStream};

#[derive(Debug, Clone, PartialEq)]
pub enum LocationEventKind {
    /// The permission request was refused; nothing will be delivered.
    PermissionDenied,
    Sample(Position),
    /// The provider failed; nothing more will be delivered.
    Terminated(LocationError),
}

/// A delivery tagged with the activation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEvent {
    pub generation: u64,
    pub kind: LocationEventKind,
}

/// Receiving end of a [`LocationSource`].
///
/// Events from any activation other than the current one are dropped.
pub struct LocationEvents {
    rx: mpsc::Receiver<LocationEvent>,
    generation: Arc<AtomicU64>,
}

impl LocationEvents {
    /// Next event of the current activation. Cancel safe.
    pub async fn recv(&mut self) -> Option<LocationEvent> {
        loop {
            let event = self.rx.recv().await?;
            let current = self.generation.load(Ordering::SeqCst);
            if event.generation == current {
                return Some(event);
            }
            debug!(
                generation = event.generation,
                current, "discarding delivery from stopped activation"
            );
        }
    }
}

/// Wraps a [`LocationProvider`] and forwards its samples while active.
pub struct LocationSource {
    provider: Arc<dyn LocationProvider>,
    tx: mpsc::Sender<LocationEvent>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl LocationSource {
    pub fn new(provider: Arc<dyn LocationProvider>, capacity: usize) -> (Self, LocationEvents) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let generation = Arc::new(AtomicU64::new(0));
        let events = LocationEvents {
            rx,
            generation: Arc::clone(&generation),
        };
        (
            Self {
                provider,
                tx,
                generation,
                task: None,
            },
            events,
        )
    }

    /// Request permission once and, if granted, forward samples.
    ///
    /// No-op while already active. Returns the activation's generation.
    pub fn start(&mut self) -> u64 {
        if self.is_active() {
            return self.generation.load(Ordering::SeqCst);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        info!(generation, "starting location delivery");
        self.task = Some(tokio::spawn(forward(provider, tx, generation)));
        generation
    }

    /// Detach the provider. Idempotent, and safe if never started.
    ///
    /// Once this returns, nothing from the stopped activation is received.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            task.abort();
            info!("location delivery stopped");
        }
    }

    /// `true` between `start()` and `stop()`, including after the
    /// activation ended on its own (denied or terminated).
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// A fresh, independent position stream straight from the provider.
    pub fn subscribe(&self) -> PositionStream {
        self.provider.positions()
    }
}

impl Drop for LocationSource {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn forward(
    provider: Arc<dyn LocationProvider>,
    tx: mpsc::Sender<LocationEvent>,
    generation: u64,
) {
    if !provider.request_permission().await {
        warn!(generation, "location permission denied");
        let _ = tx
            .send(LocationEvent {
                generation,
                kind: LocationEventKind::PermissionDenied,
            })
            .await;
        return;
    }

    let mut positions = provider.positions();
    while let Some(item) = positions.next().await {
        match item {
            Ok(position) => {
                let event = LocationEvent {
                    generation,
                    kind: LocationEventKind::Sample(position),
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!(generation, error = %error, "location provider terminated");
                let _ = tx
                    .send(LocationEvent {
                        generation,
                        kind: LocationEventKind::Terminated(error),
                    })
                    .await;
                return;
            }
        }
    }
    debug!(generation, "position stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::PushProvider;
    use std::time::Duration;

    async fn settle(provider: &PushProvider, subscribers: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while provider.subscriber_count() != subscribers {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscriber count never settled");
    }

    async fn next(events: &mut LocationEvents) -> LocationEvent {
        tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event")
            .expect("channel open")
    }

    fn granted() -> PushProvider {
        let provider = PushProvider::new();
        provider.set_permission(true);
        provider
    }

    #[tokio::test]
    async fn forwards_samples_in_order() {
        let provider = granted();
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 8);
        let generation = source.start();
        settle(&provider, 1).await;

        provider.push(Position::now(1.0, 1.0));
        provider.push(Position::now(2.0, 2.0));

        let a = next(&mut events).await;
        let b = next(&mut events).await;
        assert_eq!(a.generation, generation);
        assert!(matches!(a.kind, LocationEventKind::Sample(p) if p.latitude() == 1.0));
        assert!(matches!(b.kind, LocationEventKind::Sample(p) if p.latitude() == 2.0));
    }

    #[tokio::test]
    async fn denied_permission_emits_event_and_never_subscribes() {
        let provider = PushProvider::new();
        provider.set_permission(false);
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 8);
        source.start();

        assert_eq!(next(&mut events).await.kind, LocationEventKind::PermissionDenied);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn restart_discards_previous_generation() {
        let provider = granted();
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 8);
        source.start();
        settle(&provider, 1).await;

        provider.push(Position::now(1.0, 1.0));
        assert!(matches!(next(&mut events).await.kind, LocationEventKind::Sample(_)));

        // Possibly already forwarded into the channel before stop().
        provider.push(Position::now(2.0, 2.0));
        tokio::task::yield_now().await;
        source.stop();
        settle(&provider, 0).await;

        let generation = source.start();
        settle(&provider, 1).await;
        provider.push(Position::now(3.0, 3.0));

        let event = next(&mut events).await;
        assert_eq!(event.generation, generation);
        assert!(matches!(event.kind, LocationEventKind::Sample(p) if p.latitude() == 3.0));
    }

    #[tokio::test]
    async fn burst_beyond_channel_capacity_is_delivered_whole() {
        let provider = granted();
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 4);
        source.start();
        settle(&provider, 1).await;

        for i in 0..100 {
            provider.push(Position::now(i as f64, 0.0));
        }

        for i in 0..100 {
            match next(&mut events).await.kind {
                LocationEventKind::Sample(p) => assert_eq!(p.latitude(), i as f64),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn nothing_after_stop() {
        let provider = granted();
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 8);
        source.start();
        settle(&provider, 1).await;
        provider.push(Position::now(1.0, 1.0));
        source.stop();

        let received = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn provider_error_is_terminal() {
        let provider = granted();
        let (mut source, mut events) = LocationSource::new(Arc::new(provider.clone()), 8);
        source.start();
        settle(&provider, 1).await;

        provider.fail(LocationError::PermissionRevoked);
        assert_eq!(
            next(&mut events).await.kind,
            LocationEventKind::Terminated(LocationError::PermissionRevoked)
        );
        settle(&provider, 0).await;
        assert_eq!(provider.push(Position::now(1.0, 1.0)), 0);
        assert!(source.is_active());
    }

    #[test]
    fn stop_is_idempotent_and_safe_unstarted() {
        let provider = granted();
        let (mut source, _events) = LocationSource::new(Arc::new(provider), 8);
        source.stop();
        source.stop();
        assert_eq!(source.generation(), 0);
        assert!(!source.is_active());
    }

    #[tokio::test]
    async fn start_while_active_is_noop() {
        let provider = granted();
        let (mut source, _events) = LocationSource::new(Arc::new(provider.clone()), 8);
        let first = source.start();
        let second = source.start();
        assert_eq!(first, second);
        settle(&provider, 1).await;
    }
}
