//! Public handle for interacting with the realtime connection.

use std::sync::Arc;
use std::time::Duration;

use ridelink_common::PresenceError;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::warn;

use super::connection::connection_loop;
use super::types::{RealtimeCommand, RealtimeConfig, RealtimeEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for interacting with the realtime connection.
///
/// Methods send commands to the background connection task. Only
/// [`RealtimeClient::set`] waits for the backend.
pub struct RealtimeClient {
    command_tx: mpsc::Sender<RealtimeCommand>,
    connected: Arc<RwLock<bool>>,
}

impl RealtimeClient {
    /// Create a new client and start the background connection.
    /// Returns `(client, event_receiver)`.
    pub fn connect(config: RealtimeConfig) -> (Self, mpsc::Receiver<RealtimeEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));

        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };

        tokio::spawn(connection_loop(config, connected, event_tx, command_rx));

        (client, event_rx)
    }

    /// Clone the command sender to create a lightweight handle
    /// that can send commands to the same connection.
    pub fn clone_sender(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    /// Start receiving values for a path.
    pub async fn join(&self, topic: &str) {
        let _ = self
            .command_tx
            .send(RealtimeCommand::Join {
                topic: topic.to_string(),
            })
            .await;
    }

    /// Stop receiving values for a path.
    pub async fn leave(&self, topic: &str) {
        let _ = self
            .command_tx
            .send(RealtimeCommand::Leave {
                topic: topic.to_string(),
            })
            .await;
    }

    /// Fire-and-forget join, for use from synchronous paths.
    ///
    /// Returns `false` and logs if the command could not be queued.
    pub fn try_join(&self, topic: &str) -> bool {
        self.try_command(RealtimeCommand::Join {
            topic: topic.to_string(),
        })
    }

    /// Fire-and-forget leave, for use from synchronous drop paths.
    pub fn try_leave(&self, topic: &str) -> bool {
        self.try_command(RealtimeCommand::Leave {
            topic: topic.to_string(),
        })
    }

    fn try_command(&self, command: RealtimeCommand) -> bool {
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(command)) => {
                warn!(command = ?command, "realtime command queue full; command dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(command)) => {
                warn!(command = ?command, "realtime connection closed; command dropped");
                false
            }
        }
    }

    /// Write `value` to a path and wait for the backend's reply.
    ///
    /// Gives up with [`PresenceError::Timeout`] after `timeout`. A write
    /// abandoned this way is not sent if it is still queued.
    pub async fn set(
        &self,
        topic: &str,
        value: serde_json::Value,
        timeout: Duration,
    ) -> Result<(), PresenceError> {
        if !self.is_connected().await {
            return Err(PresenceError::WriteFailed("not connected".into()));
        }

        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RealtimeCommand::Set {
                topic: topic.to_string(),
                value,
                reply,
            })
            .await
            .map_err(|_| PresenceError::Closed)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PresenceError::Closed),
            Err(_) => Err(PresenceError::Timeout(timeout.as_secs())),
        }
    }

    /// Check if connected.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Disconnect from the server.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(RealtimeCommand::Disconnect).await;
    }

    /// A client with no connection task behind it. Commands land in the
    /// returned receiver.
    #[cfg(test)]
    pub(crate) fn detached(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RealtimeCommand>, Arc<RwLock<bool>>) {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let connected = Arc::new(RwLock::new(false));
        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };
        (client, command_rx, connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached() -> (RealtimeClient, mpsc::Receiver<RealtimeCommand>, Arc<RwLock<bool>>) {
        RealtimeClient::detached(8)
    }

    #[tokio::test]
    async fn set_fails_fast_when_offline() {
        let (client, mut commands, _) = detached();
        let err = client
            .set("driver_status/connected", serde_json::json!(true), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, PresenceError::WriteFailed("not connected".into()));
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn set_resolves_with_backend_reply() {
        let (client, mut commands, connected) = detached();
        *connected.write().await = true;

        let backend = tokio::spawn(async move {
            match commands.recv().await {
                Some(RealtimeCommand::Set { topic, value, reply }) => {
                    assert_eq!(topic, "driver_status/connected");
                    assert_eq!(value, serde_json::json!(true));
                    let _ = reply.send(Ok(()));
                }
                other => panic!("unexpected {other:?}"),
            }
        });

        client
            .set("driver_status/connected", serde_json::json!(true), Duration::from_secs(5))
            .await
            .unwrap();
        backend.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn set_times_out_and_abandons_reply() {
        let (client, mut commands, connected) = detached();
        *connected.write().await = true;

        let err = client
            .set("driver_status/connected", serde_json::json!(false), Duration::from_secs(3))
            .await
            .unwrap_err();
        assert_eq!(err, PresenceError::Timeout(3));

        match commands.recv().await {
            Some(RealtimeCommand::Set { reply, .. }) => assert!(reply.is_closed()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn try_join_reports_full_queue() {
        let (client, mut commands, _) = RealtimeClient::detached(1);
        assert!(client.try_join("a"));
        assert!(!client.try_join("b"));

        assert!(matches!(commands.try_recv(), Ok(RealtimeCommand::Join { topic }) if topic == "a"));
        assert!(commands.try_recv().is_err());

        drop(commands);
        assert!(!client.try_leave("a"));
    }

    #[tokio::test]
    async fn join_and_leave_are_forwarded() {
        let (client, mut commands, _) = detached();
        client.join("a").await;
        client.try_leave("a");
        assert!(matches!(commands.recv().await, Some(RealtimeCommand::Join { topic }) if topic == "a"));
        assert!(matches!(commands.recv().await, Some(RealtimeCommand::Leave { topic }) if topic == "a"));
    }
}
