//! The platform location seam.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use ridelink_common::{LocationError, Position};

/// A lazy sequence of samples. An `Err` item is terminal.
pub type PositionStream = BoxStream<'static, Result<Position, LocationError>>;

/// Platform location provider.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for the location permission. Resolves to `true` if granted.
    async fn request_permission(&self) -> bool;

    /// A fresh position stream. Nothing happens until it is polled, and
    /// every call starts a new, independent sequence.
    fn positions(&self) -> PositionStream;
}
