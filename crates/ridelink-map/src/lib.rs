//! The driver's map marker and the surface it is drawn on.

pub mod marker;
pub mod surface;
pub mod tracing_surface;

pub use marker::{MarkerSettings, MarkerState, MarkerSync};
pub use surface::{MapSurface, MarkerHandle, PuckSettings};
pub use tracing_surface::{SurfaceStats, TracingSurface};
