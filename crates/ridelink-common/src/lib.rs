pub mod errors;
pub mod events;
pub mod id;
pub mod notifications;
pub mod types;

pub use errors::{
    ConfigError, LifecycleError, LocationError, MapError, PresenceError, RideLinkError,
};
pub use events::{DriverEvent, EventBus};
pub use id::{new_id, SessionId};
pub use notifications::{Notification, NotificationLevel, NotificationQueue};
pub use types::{GeoPoint, Position, PresenceOrigin, SurfaceLifecycleState};

pub type Result<T> = std::result::Result<T, RideLinkError>;
