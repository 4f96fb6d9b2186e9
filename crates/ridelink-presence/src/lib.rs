//! Driver presence: the online/offline flag shared with a remote store.
//!
//! [`PresenceController`] owns the reconciliation rules between local
//! toggles and remote updates. [`PresenceStore`] is the seam to the
//! backend, with a realtime WebSocket implementation and an in-memory one.

pub mod controller;
pub mod memory;
pub mod realtime;
pub mod remote;
pub mod store;

pub use controller::{PresenceController, PresenceFlag, PublishOutcome, Reconcile};
pub use memory::MemoryPresenceStore;
pub use realtime::{RealtimeClient, RealtimeConfig, RealtimeEvent};
pub use remote::RealtimePresenceStore;
pub use store::{PresenceRecord, PresenceStore, PresenceSubscription, RemoteEvent, RemoteValue};
