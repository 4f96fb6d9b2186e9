//! Built-in track used when no recording is given.

use ridelink_common::GeoPoint;

const CENTER: GeoPoint = GeoPoint {
    latitude: 37.7749,
    longitude: -122.4194,
};
const RADIUS_DEG: f64 = 0.002;

/// A closed loop of `points` around downtown San Francisco.
pub fn demo_track(points: usize) -> Vec<GeoPoint> {
    let points = points.max(1);
    (0..points)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / points as f64;
            GeoPoint::new(
                CENTER.latitude + RADIUS_DEG * angle.sin(),
                CENTER.longitude + RADIUS_DEG * angle.cos(),
            )
        })
        .collect()
}
