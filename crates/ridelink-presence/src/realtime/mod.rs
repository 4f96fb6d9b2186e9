//! Thin realtime key-value client over the Phoenix Channels v1 protocol.
//!
//! One topic per database path. Joining a topic streams its current value
//! and every change; `set` writes a value and waits for the `phx_reply`.
//! Handles heartbeats and auto-reconnect with backoff.

mod client;
mod connection;
mod handler;
mod types;

pub use client::RealtimeClient;
pub use types::{events, PhoenixMessage, RealtimeConfig, RealtimeEvent};

#[cfg(test)]
pub(crate) use types::RealtimeCommand;
