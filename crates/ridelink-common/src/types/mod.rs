mod core;
mod geo;

pub use self::core::*;
pub use geo::*;
