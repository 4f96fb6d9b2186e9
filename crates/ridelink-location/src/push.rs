//! Provider fed by a platform bridge.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::stream;
use ridelink_common::{LocationError, Position};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::provider::{LocationProvider, PositionStream};

type Fix = Result<Position, LocationError>;

/// Location provider that the platform pushes permission answers and
/// fixes into.
///
/// Each stream only sees fixes pushed after it subscribed, and buffers
/// them until read. A slow reader never loses a fix.
#[derive(Clone)]
pub struct PushProvider {
    streams: Arc<Mutex<Vec<mpsc::UnboundedSender<Fix>>>>,
    permission: Arc<watch::Sender<Option<bool>>>,
}

impl Default for PushProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PushProvider {
    pub fn new() -> Self {
        let (permission, _) = watch::channel(None);
        Self {
            streams: Arc::default(),
            permission: Arc::new(permission),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<Fix>>> {
        self.streams.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Answer pending and future permission requests.
    pub fn set_permission(&self, granted: bool) {
        self.permission.send_replace(Some(granted));
    }

    /// Forget the last answer; the next request waits for a new one.
    pub fn reset_permission(&self) {
        self.permission.send_replace(None);
    }

    /// Push a fix. Returns the number of streams that received it.
    pub fn push(&self, position: Position) -> usize {
        let mut streams = self.lock();
        streams.retain(|tx| tx.send(Ok(position)).is_ok());
        streams.len()
    }

    /// Terminate every open stream with `error`.
    pub fn fail(&self, error: LocationError) -> usize {
        let streams = std::mem::take(&mut *self.lock());
        streams
            .into_iter()
            .filter(|tx| tx.send(Err(error.clone())).is_ok())
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut streams = self.lock();
        streams.retain(|tx| !tx.is_closed());
        streams.len()
    }
}

#[async_trait]
impl LocationProvider for PushProvider {
    async fn request_permission(&self) -> bool {
        let mut rx = self.permission.subscribe();
        let granted = match rx.wait_for(Option::is_some).await {
            Ok(answer) => answer.unwrap_or(false),
            Err(_) => false,
        };
        granted
    }

    fn positions(&self) -> PositionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        Box::pin(stream::unfold(Some(rx), |state| async move {
            let mut rx = state?;
            match rx.recv().await {
                Some(Ok(position)) => Some((Ok(position), Some(rx))),
                Some(Err(error)) => Some((Err(error), None)),
                None => {
                    debug!("position bridge closed");
                    None
                }
            }
        }))
    }
}
