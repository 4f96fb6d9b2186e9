//! Headless surface that logs every operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ridelink_common::{GeoPoint, MapError};
use tracing::{debug, info};

use crate::surface::{MapSurface, MarkerHandle, PuckSettings};

/// What a [`TracingSurface`] has been asked to do so far.
#[derive(Debug, Clone, Default)]
pub struct SurfaceStats {
    pub markers_created: usize,
    pub markers_removed: usize,
    pub camera_moves: usize,
    pub camera: Option<(GeoPoint, f64)>,
    pub live_markers: HashMap<MarkerHandle, GeoPoint>,
    pub icons: Vec<String>,
    pub puck: Option<PuckSettings>,
    pub releases: usize,
}

impl SurfaceStats {
    /// The single live marker's position, if exactly one exists.
    pub fn only_marker(&self) -> Option<GeoPoint> {
        match self.live_markers.len() {
            1 => self.live_markers.values().next().copied(),
            _ => None,
        }
    }
}

#[derive(Default)]
struct SurfaceInner {
    stats: SurfaceStats,
    next_handle: u64,
    released: bool,
    fail_next_add: bool,
    fail_next_remove: bool,
    fail_next_camera: bool,
}

/// A [`MapSurface`] without rendering. Operations are logged and counted.
///
/// Clones share state, so a clone kept aside observes the surface after
/// it has been handed to a marker.
#[derive(Clone, Default)]
pub struct TracingSurface {
    inner: Arc<Mutex<SurfaceInner>>,
}

impl TracingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn stats(&self) -> SurfaceStats {
        self.lock().stats.clone()
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Make the next `add_marker` fail.
    pub fn fail_next_add(&self) {
        self.lock().fail_next_add = true;
    }

    /// Make the next `remove_marker` fail and leave the marker in place.
    pub fn fail_next_remove(&self) {
        self.lock().fail_next_remove = true;
    }

    /// Make the next `set_camera` fail.
    pub fn fail_next_camera(&self) {
        self.lock().fail_next_camera = true;
    }
}

fn ensure_live(inner: &SurfaceInner) -> Result<(), MapError> {
    if inner.released {
        Err(MapError::Released)
    } else {
        Ok(())
    }
}

impl MapSurface for TracingSurface {
    fn set_camera(&mut self, center: GeoPoint, zoom: f64) -> Result<(), MapError> {
        let mut inner = self.lock();
        ensure_live(&inner)?;
        if std::mem::take(&mut inner.fail_next_camera) {
            return Err(MapError::CameraFailed("injected failure".into()));
        }
        debug!(center = %center, zoom, "camera");
        inner.stats.camera_moves += 1;
        inner.stats.camera = Some((center, zoom));
        Ok(())
    }

    fn register_icon(&mut self, icon: &str) -> Result<(), MapError> {
        let mut inner = self.lock();
        ensure_live(&inner)?;
        info!(icon, "icon registered");
        inner.stats.icons.push(icon.to_string());
        Ok(())
    }

    fn configure_puck(&mut self, settings: PuckSettings) -> Result<(), MapError> {
        let mut inner = self.lock();
        ensure_live(&inner)?;
        info!(enabled = settings.enabled, pulsing = settings.pulsing, "location puck configured");
        inner.stats.puck = Some(settings);
        Ok(())
    }

    fn add_marker(&mut self, at: GeoPoint, icon: &str) -> Result<MarkerHandle, MapError> {
        let mut inner = self.lock();
        ensure_live(&inner)?;
        if std::mem::take(&mut inner.fail_next_add) {
            return Err(MapError::MarkerFailed("injected failure".into()));
        }
        if !inner.stats.icons.iter().any(|i| i == icon) {
            return Err(MapError::MarkerFailed(format!("icon not registered: {icon}")));
        }
        inner.next_handle += 1;
        let handle = MarkerHandle::new(inner.next_handle);
        inner.stats.markers_created += 1;
        inner.stats.live_markers.insert(handle, at);
        info!(marker = handle.raw(), position = %at, "marker placed");
        Ok(handle)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), MapError> {
        let mut inner = self.lock();
        ensure_live(&inner)?;
        if std::mem::take(&mut inner.fail_next_remove) {
            return Err(MapError::MarkerFailed("injected failure".into()));
        }
        if inner.stats.live_markers.remove(&handle).is_none() {
            return Err(MapError::MarkerFailed(format!("unknown marker {}", handle.raw())));
        }
        inner.stats.markers_removed += 1;
        debug!(marker = handle.raw(), "marker removed");
        Ok(())
    }

    fn release(&mut self) {
        let mut inner = self.lock();
        inner.stats.releases += 1;
        if !inner.released {
            inner.released = true;
            inner.stats.live_markers.clear();
            info!("map surface released");
        }
    }
}
