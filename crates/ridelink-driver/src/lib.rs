//! The driver home screen without a UI toolkit.
//!
//! [`spawn_session`] wires a presence store, a location provider and a
//! map surface into one actor. The UI talks to it through a
//! [`SessionHandle`] and renders [`SessionView`] snapshots.

pub mod lifecycle;
pub mod session;
pub mod settings;

pub use lifecycle::{GateAction, LifecycleGate};
pub use session::{spawn_session, SessionCommand, SessionHandle, SessionView, PERMISSION_NOTICE};
pub use settings::{SessionSettings, PROBE_MESSAGE};
