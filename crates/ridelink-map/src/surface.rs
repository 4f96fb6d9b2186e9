//! The rendering seam.

use ridelink_common::{GeoPoint, MapError};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a marker annotation on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Settings for the platform's own location indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuckSettings {
    pub enabled: bool,
    pub pulsing: bool,
}

impl Default for PuckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pulsing: true,
        }
    }
}

/// A map view that can show one camera and any number of markers.
///
/// Calls are made from a single owner and must not block.
pub trait MapSurface: Send {
    fn set_camera(&mut self, center: GeoPoint, zoom: f64) -> Result<(), MapError>;

    /// Register the image used by [`MapSurface::add_marker`].
    fn register_icon(&mut self, icon: &str) -> Result<(), MapError>;

    fn configure_puck(&mut self, settings: PuckSettings) -> Result<(), MapError>;

    fn add_marker(&mut self, at: GeoPoint, icon: &str) -> Result<MarkerHandle, MapError>;

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), MapError>;

    /// Release the surface and every annotation on it.
    fn release(&mut self);
}

impl<S: MapSurface + ?Sized> MapSurface for Box<S> {
    fn set_camera(&mut self, center: GeoPoint, zoom: f64) -> Result<(), MapError> {
        (**self).set_camera(center, zoom)
    }

    fn register_icon(&mut self, icon: &str) -> Result<(), MapError> {
        (**self).register_icon(icon)
    }

    fn configure_puck(&mut self, settings: PuckSettings) -> Result<(), MapError> {
        (**self).configure_puck(settings)
    }

    fn add_marker(&mut self, at: GeoPoint, icon: &str) -> Result<MarkerHandle, MapError> {
        (**self).add_marker(at, icon)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), MapError> {
        (**self).remove_marker(handle)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
