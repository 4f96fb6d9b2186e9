//! Incoming Phoenix message handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ridelink_common::PresenceError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{events, PhoenixMessage, RealtimeEvent, WriteReply};

/// Writes waiting for their `phx_reply`, keyed by message ref.
pub(crate) type PendingWrites = Arc<Mutex<HashMap<String, WriteReply>>>;

/// Extract the short topic name from a Phoenix topic (strip "realtime:" prefix).
fn strip_topic_prefix(topic: &str) -> &str {
    topic.strip_prefix("realtime:").unwrap_or(topic)
}

fn reply_reason(payload: &serde_json::Value) -> String {
    payload
        .get("response")
        .and_then(|r| r.get("reason"))
        .and_then(|r| r.as_str())
        .unwrap_or("unknown error")
        .to_string()
}

fn take_pending(pending: &PendingWrites, msg_ref: &str) -> Option<WriteReply> {
    pending
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .remove(msg_ref)
}

/// Track a write until its reply arrives.
///
/// Writes whose caller has already given up are dropped first, so a
/// backend that never answers cannot grow the map without bound.
pub(crate) fn insert_pending(pending: &PendingWrites, msg_ref: String, reply: WriteReply) {
    let mut writes = pending.lock().unwrap_or_else(|p| p.into_inner());
    let before = writes.len();
    writes.retain(|_, waiting| !waiting.is_closed());
    let swept = before - writes.len();
    if swept > 0 {
        debug!(swept, "dropped abandoned writes");
    }
    writes.insert(msg_ref, reply);
}

/// Fail every write still waiting for a reply.
pub(crate) fn fail_pending(pending: &PendingWrites, reason: &str) {
    let drained: Vec<WriteReply> = pending
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .drain()
        .map(|(_, reply)| reply)
        .collect();
    for reply in drained {
        let _ = reply.send(Err(PresenceError::WriteFailed(reason.to_string())));
    }
}

/// Handle a single incoming Phoenix message.
pub(crate) async fn handle_phoenix_message(
    msg: &PhoenixMessage,
    pending: &PendingWrites,
    event_tx: &mpsc::Sender<RealtimeEvent>,
) {
    let topic = strip_topic_prefix(&msg.topic);

    match msg.event.as_str() {
        events::REPLY => {
            let status = msg
                .payload
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("error");

            // Replies to writes resolve the waiting caller; everything else
            // is a join acknowledgment.
            if let Some(reply) = msg.msg_ref.as_deref().and_then(|r| take_pending(pending, r)) {
                let result = if status == "ok" {
                    Ok(())
                } else {
                    Err(PresenceError::WriteFailed(reply_reason(&msg.payload)))
                };
                debug!(topic = %topic, status = %status, "write reply");
                let _ = reply.send(result);
                return;
            }

            if status == "ok" {
                debug!(topic = %topic, "join reply: ok");
                let _ = event_tx
                    .send(RealtimeEvent::Joined {
                        topic: topic.to_string(),
                    })
                    .await;
            } else {
                let message = reply_reason(&msg.payload);
                warn!(topic = %topic, status = %status, "join reply error");
                let _ = event_tx
                    .send(RealtimeEvent::TopicError {
                        topic: topic.to_string(),
                        message,
                    })
                    .await;
            }
        }
        events::ERROR => {
            warn!(topic = %topic, "topic error");
            let _ = event_tx
                .send(RealtimeEvent::TopicError {
                    topic: topic.to_string(),
                    message: "topic error".to_string(),
                })
                .await;
        }
        events::CLOSE => {
            info!(topic = %topic, "topic closed");
            let _ = event_tx
                .send(RealtimeEvent::TopicError {
                    topic: topic.to_string(),
                    message: "topic closed".to_string(),
                })
                .await;
        }
        events::VALUE => {
            let value = msg
                .payload
                .get("value")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            debug!(topic = %topic, "value received");
            let _ = event_tx
                .send(RealtimeEvent::Value {
                    topic: topic.to_string(),
                    value,
                })
                .await;
        }
        _ => {
            debug!(topic = %topic, event = %msg.event, "unhandled Phoenix event");
        }
    }
}
