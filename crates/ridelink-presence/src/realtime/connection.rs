//! Background WebSocket connection loop with auto-reconnect.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::handler::{fail_pending, handle_phoenix_message, insert_pending, PendingWrites};
use super::types::{events, PhoenixMessage, RealtimeCommand, RealtimeConfig, RealtimeEvent};

// ---------------------------------------------------------------------------
// Ref Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing ref counter for Phoenix messages.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Topics to rejoin after a reconnect.
type JoinedTopics = Arc<RwLock<HashSet<String>>>;

async fn send_message<S>(ws_write: &Mutex<S>, msg: &PhoenixMessage) -> bool
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => {
            let mut writer = ws_write.lock().await;
            writer.send(WsMessage::Text(json.into())).await.is_ok()
        }
        Err(e) => {
            warn!(error = %e, "failed to encode Phoenix message");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the WebSocket connection with auto-reconnect.
///
/// Exits after a `Disconnect` command or once every client handle is dropped.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    command_rx: mpsc::Receiver<RealtimeCommand>,
) {
    let command_rx = Arc::new(Mutex::new(command_rx));
    let joined_topics: JoinedTopics = Arc::new(RwLock::new(HashSet::new()));
    let pending: PendingWrites = Arc::default();
    let mut reconnect_delay = config.reconnect_delay_secs.max(1);

    loop {
        info!(url = %config.redacted_url(), "connecting to presence backend");

        match tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            tokio_tungstenite::connect_async(config.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs.max(1);
                *connected.write().await = true;
                let _ = event_tx.send(RealtimeEvent::Connected).await;

                let (ws_write, ws_read) = ws_stream.split();
                let ws_write = Arc::new(Mutex::new(ws_write));

                // Rejoin previously-joined topics.
                {
                    let topics = joined_topics.read().await;
                    for topic in topics.iter() {
                        let msg = PhoenixMessage::new(
                            topic,
                            events::JOIN,
                            serde_json::json!({}),
                            next_ref(),
                        );
                        send_message(&ws_write, &msg).await;
                    }
                }

                let heartbeat_handle = tokio::spawn(heartbeat_task(
                    Arc::clone(&ws_write),
                    config.heartbeat_interval_secs,
                ));

                let mut cmd_handle = tokio::spawn(command_forwarder(
                    Arc::clone(&command_rx),
                    Arc::clone(&ws_write),
                    Arc::clone(&joined_topics),
                    Arc::clone(&pending),
                ));

                let mut read_stream = ws_read;
                let stop = loop {
                    tokio::select! {
                        msg_result = read_stream.next() => match msg_result {
                            Some(Ok(WsMessage::Text(text))) => {
                                match serde_json::from_str::<PhoenixMessage>(&text) {
                                    Ok(phoenix_msg) => {
                                        handle_phoenix_message(&phoenix_msg, &pending, &event_tx)
                                            .await;
                                    }
                                    Err(_) => debug!(text = %text.as_str(), "unrecognized message"),
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("presence backend closed connection");
                                break false;
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket error");
                                break false;
                            }
                            Some(Ok(_)) => {}
                        },
                        // The forwarder only returns on Disconnect or when
                        // every client handle is gone.
                        _ = &mut cmd_handle => break true,
                    }
                };

                heartbeat_handle.abort();
                cmd_handle.abort();
                fail_pending(&pending, "connection lost");
                *connected.write().await = false;
                let _ = event_tx.send(RealtimeEvent::Disconnected).await;

                if stop {
                    info!("presence connection shut down");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "failed to connect to presence backend");
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!("connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                error!(
                    timeout = config.connect_timeout_secs,
                    "presence connection timed out"
                );
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!(
                        "connection timed out after {}s",
                        config.connect_timeout_secs
                    )))
                    .await;
            }
        }

        if event_tx.is_closed() {
            debug!("no event receiver left; stopping reconnect loop");
            return;
        }

        info!(delay = reconnect_delay, "reconnecting in {} seconds", reconnect_delay);
        tokio::time::sleep(Duration::from_secs(reconnect_delay)).await;
        reconnect_delay = config.next_backoff(reconnect_delay);
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, interval_secs: u64)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        let msg = PhoenixMessage {
            topic: "phoenix".to_string(),
            event: events::HEARTBEAT.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(next_ref()),
        };
        if !send_message(&ws_write, &msg).await {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

async fn command_forwarder<S>(
    cmd_rx: Arc<Mutex<mpsc::Receiver<RealtimeCommand>>>,
    cmd_write: Arc<Mutex<S>>,
    topics: JoinedTopics,
    pending: PendingWrites,
) where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut rx = cmd_rx.lock().await;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            RealtimeCommand::Join { topic } => {
                let msg = PhoenixMessage::new(&topic, events::JOIN, serde_json::json!({}), next_ref());
                send_message(&cmd_write, &msg).await;
                topics.write().await.insert(topic);
            }
            RealtimeCommand::Leave { topic } => {
                let msg =
                    PhoenixMessage::new(&topic, events::LEAVE, serde_json::json!({}), next_ref());
                send_message(&cmd_write, &msg).await;
                topics.write().await.remove(&topic);
            }
            RealtimeCommand::Set {
                topic,
                value,
                reply,
            } => {
                // The caller already gave up (timeout); do not resurrect the write.
                if reply.is_closed() {
                    debug!(topic = %topic, "dropping abandoned write");
                    continue;
                }
                let msg_ref = next_ref();
                let msg = PhoenixMessage::new(
                    &topic,
                    events::SET,
                    serde_json::json!({ "value": value }),
                    msg_ref.clone(),
                );
                insert_pending(&pending, msg_ref.clone(), reply);
                if !send_message(&cmd_write, &msg).await {
                    let reply = pending
                        .lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .remove(&msg_ref);
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(ridelink_common::PresenceError::WriteFailed(
                            "send failed".into(),
                        )));
                    }
                }
            }
            RealtimeCommand::Disconnect => {
                let joined: Vec<String> = topics.read().await.iter().cloned().collect();
                for topic in joined {
                    let msg = PhoenixMessage::new(
                        &topic,
                        events::LEAVE,
                        serde_json::json!({}),
                        next_ref(),
                    );
                    send_message(&cmd_write, &msg).await;
                }
                let mut writer = cmd_write.lock().await;
                let _ = writer.send(WsMessage::Close(None)).await;
                return;
            }
        }
    }
}
