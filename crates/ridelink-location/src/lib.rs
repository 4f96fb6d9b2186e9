//! Location delivery for the driver map.
//!
//! A [`LocationProvider`] answers permission requests and produces
//! position streams. [`LocationSource`] activates a provider, forwards its
//! samples as generation-tagged [`LocationEvent`]s and guarantees that
//! nothing from an older activation is observed after `stop()`.

pub mod provider;
pub mod push;
pub mod replay;
pub mod source;

pub use provider::{LocationProvider, PositionStream};
pub use push::PushProvider;
pub use replay::{load_track, ReplayProvider};
pub use source::{LocationEvent, LocationEventKind, LocationEvents, LocationSource};
