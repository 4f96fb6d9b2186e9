//! Keeps exactly one marker on the surface at the driver's latest position.

use ridelink_common::{MapError, Position};
use tracing::{debug, info, warn};

use crate::surface::{MapSurface, MarkerHandle, PuckSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSettings {
    pub zoom: f64,
    pub icon: String,
    pub puck: PuckSettings,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            zoom: 15.0,
            icon: "user-location-marker".to_string(),
            puck: PuckSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarkerState {
    pub position: Option<Position>,
    pub handle: Option<MarkerHandle>,
}

/// Owner of the driver marker.
///
/// Nothing reaches the surface before [`MarkerSync::on_style_loaded`] or
/// after [`MarkerSync::release`].
pub struct MarkerSync<S: MapSurface> {
    surface: S,
    settings: MarkerSettings,
    state: MarkerState,
    style_loaded: bool,
    released: bool,
}

impl<S: MapSurface> MarkerSync<S> {
    pub fn new(surface: S, settings: MarkerSettings) -> Self {
        Self {
            surface,
            settings,
            state: MarkerState::default(),
            style_loaded: false,
            released: false,
        }
    }

    /// Register the marker icon and configure the puck, then accept positions.
    ///
    /// Repeated calls are no-ops.
    pub fn on_style_loaded(&mut self) -> Result<(), MapError> {
        if self.released {
            return Err(MapError::Released);
        }
        if self.style_loaded {
            return Ok(());
        }
        self.surface.register_icon(&self.settings.icon)?;
        self.surface.configure_puck(self.settings.puck)?;
        self.style_loaded = true;
        info!(icon = %self.settings.icon, "map style loaded");
        Ok(())
    }

    /// Recenter on `position` and move the marker there.
    ///
    /// The old marker is removed before its replacement is created. The
    /// recorded position always belongs to the live marker: after a failure
    /// it is the previous one, or none if the old marker is already gone.
    pub fn on_position(&mut self, position: Position) -> Result<(), MapError> {
        if self.released {
            return Err(MapError::Released);
        }
        if !self.style_loaded {
            return Err(MapError::StyleNotLoaded);
        }

        self.surface.set_camera(position.point, self.settings.zoom)?;

        if let Some(old) = self.state.handle {
            self.surface.remove_marker(old)?;
            self.state = MarkerState::default();
        }

        let handle = self.surface.add_marker(position.point, &self.settings.icon)?;
        self.state = MarkerState {
            position: Some(position),
            handle: Some(handle),
        };
        debug!(position = %position.point, marker = handle.raw(), "marker moved");
        Ok(())
    }

    /// The provider stopped for good; the marker stays where it is.
    pub fn on_provider_terminated(&mut self) {
        match self.state.position {
            Some(p) => warn!(position = %p.point, "location lost; keeping last marker"),
            None => warn!("location lost before first fix"),
        }
    }

    /// Release the surface. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.state.handle = None;
        self.surface.release();
        true
    }

    pub fn state(&self) -> MarkerState {
        self.state
    }

    pub fn position(&self) -> Option<Position> {
        self.state.position
    }

    pub fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing_surface::TracingSurface;
    use ridelink_common::GeoPoint;
    use std::time::{Duration, Instant};

    fn ready() -> (MarkerSync<TracingSurface>, TracingSurface) {
        let surface = TracingSurface::new();
        let mut sync = MarkerSync::new(surface.clone(), MarkerSettings::default());
        sync.on_style_loaded().unwrap();
        (sync, surface)
    }

    #[test]
    fn style_load_registers_icon_and_puck_once() {
        let (mut sync, surface) = ready();
        sync.on_style_loaded().unwrap();
        let stats = surface.stats();
        assert_eq!(stats.icons, vec!["user-location-marker".to_string()]);
        assert_eq!(
            stats.puck,
            Some(PuckSettings {
                enabled: true,
                pulsing: true
            })
        );
    }

    #[test]
    fn positions_before_style_load_are_rejected() {
        let surface = TracingSurface::new();
        let mut sync = MarkerSync::new(surface.clone(), MarkerSettings::default());
        assert_eq!(
            sync.on_position(Position::now(1.0, 1.0)),
            Err(MapError::StyleNotLoaded)
        );
        let stats = surface.stats();
        assert_eq!(stats.camera_moves, 0);
        assert_eq!(stats.markers_created, 0);
        assert!(sync.position().is_none());
    }

    #[test]
    fn first_position_creates_marker_and_recenters() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(52.52, 13.405)).unwrap();

        let stats = surface.stats();
        assert_eq!(stats.markers_created, 1);
        assert_eq!(stats.markers_removed, 0);
        assert_eq!(stats.camera, Some((GeoPoint::new(52.52, 13.405), 15.0)));
        assert_eq!(stats.only_marker(), Some(GeoPoint::new(52.52, 13.405)));
    }

    #[test]
    fn jittered_samples_leave_one_marker_at_last() {
        let (mut sync, surface) = ready();
        let base = Instant::now();
        let mut last = None;
        for i in 0..100u64 {
            let jitter = Duration::from_millis((i * 37) % 13);
            let p = Position::new(
                40.0 + i as f64 * 1e-4,
                -74.0,
                base + Duration::from_secs(i) + jitter,
            );
            sync.on_position(p).unwrap();
            last = Some(p);
        }

        let stats = surface.stats();
        assert!(stats.markers_created <= 100);
        assert!(stats.markers_removed <= 99);
        assert_eq!(stats.only_marker(), last.map(|p| p.point));
        assert_eq!(sync.position(), last);
    }

    #[test]
    fn repeated_position_still_one_marker() {
        let (mut sync, surface) = ready();
        let p = Position::now(1.0, 2.0);
        sync.on_position(p).unwrap();
        sync.on_position(p).unwrap();
        assert_eq!(surface.stats().only_marker(), Some(p.point));
    }

    #[test]
    fn failed_create_leaves_no_marker() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(1.0, 1.0)).unwrap();
        surface.fail_next_add();
        assert!(matches!(
            sync.on_position(Position::now(2.0, 2.0)),
            Err(MapError::MarkerFailed(_))
        ));
        assert_eq!(sync.state(), MarkerState::default());
        assert!(surface.stats().live_markers.is_empty());

        sync.on_position(Position::now(3.0, 3.0)).unwrap();
        assert_eq!(surface.stats().only_marker(), Some(GeoPoint::new(3.0, 3.0)));
    }

    #[test]
    fn failed_remove_keeps_previous_state() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(1.0, 1.0)).unwrap();
        let before = sync.state();
        surface.fail_next_remove();

        assert!(matches!(
            sync.on_position(Position::now(2.0, 2.0)),
            Err(MapError::MarkerFailed(_))
        ));
        assert_eq!(sync.state(), before);
        assert_eq!(sync.position().map(|p| p.point), Some(GeoPoint::new(1.0, 1.0)));
        assert_eq!(surface.stats().only_marker(), Some(GeoPoint::new(1.0, 1.0)));

        sync.on_position(Position::now(3.0, 3.0)).unwrap();
        assert_eq!(surface.stats().only_marker(), Some(GeoPoint::new(3.0, 3.0)));
    }

    #[test]
    fn failed_camera_move_keeps_previous_state() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(1.0, 1.0)).unwrap();
        let before = sync.state();
        surface.fail_next_camera();

        assert!(sync.on_position(Position::now(2.0, 2.0)).is_err());
        assert_eq!(sync.state(), before);
        assert_eq!(surface.stats().only_marker(), Some(GeoPoint::new(1.0, 1.0)));
    }

    #[test]
    fn termination_keeps_marker() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(1.0, 1.0)).unwrap();
        sync.on_provider_terminated();
        assert_eq!(surface.stats().only_marker(), Some(GeoPoint::new(1.0, 1.0)));
    }

    #[test]
    fn release_happens_once() {
        let (mut sync, surface) = ready();
        sync.on_position(Position::now(1.0, 1.0)).unwrap();
        assert!(sync.release());
        assert!(!sync.release());
        assert_eq!(surface.stats().releases, 1);
        assert_eq!(
            sync.on_position(Position::now(2.0, 2.0)),
            Err(MapError::Released)
        );
        assert_eq!(sync.on_style_loaded(), Err(MapError::Released));
    }
}
