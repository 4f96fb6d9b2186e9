//! Provider that replays a recorded track.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use ridelink_common::{GeoPoint, LocationError, Position, RideLinkError};
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::provider::{LocationProvider, PositionStream};

/// Load a track: a JSON array of `{"latitude": .., "longitude": ..}`.
pub fn load_track(path: &Path) -> Result<Vec<GeoPoint>, RideLinkError> {
    let content = std::fs::read_to_string(path)?;
    let track: Vec<GeoPoint> = serde_json::from_str(&content)
        .map_err(|e| RideLinkError::Other(format!("invalid track {}: {e}", path.display())))?;

    if let Some(index) = track.iter().position(|p| !p.is_valid()) {
        return Err(RideLinkError::Other(format!(
            "invalid track {}: point {index} is out of range",
            path.display()
        )));
    }

    info!(path = %path.display(), points = track.len(), "loaded replay track");
    Ok(track)
}

/// Replays a fixed track at a fixed interval, looping forever.
///
/// Permission is always granted. Each stream starts at the first point.
#[derive(Debug, Clone)]
pub struct ReplayProvider {
    track: Arc<[GeoPoint]>,
    interval: Duration,
}

impl ReplayProvider {
    pub fn new(track: Vec<GeoPoint>, interval: Duration) -> Self {
        Self {
            track: track.into(),
            interval,
        }
    }

    pub fn from_file(path: &Path, interval: Duration) -> Result<Self, RideLinkError> {
        Ok(Self::new(load_track(path)?, interval))
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    async fn request_permission(&self) -> bool {
        true
    }

    fn positions(&self) -> PositionStream {
        if self.track.is_empty() {
            return Box::pin(stream::iter([Err(LocationError::ProviderUnavailable(
                "empty track".into(),
            ))]));
        }

        let track = Arc::clone(&self.track);
        let period = self.interval.max(Duration::from_millis(1));
        Box::pin(stream::unfold(
            (track, 0usize, None),
            move |(track, index, ticker)| async move {
                let mut ticker = ticker.unwrap_or_else(|| {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker
                });
                ticker.tick().await;
                let point = track[index];
                let next = (index + 1) % track.len();
                Some((
                    Ok(Position::now(point.latitude, point.longitude)),
                    (track, next, Some(ticker)),
                ))
            },
        ))
    }
}
