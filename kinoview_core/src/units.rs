//! Unit conversions for the layer that feeds the engine.
//!
//! The kinematics service speaks degrees and millimeters; the engine only
//! accepts radians and meters. These helpers are what a caller uses to
//! turn a service response into an `update_pose` argument.

/// Converts degrees to radians.
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Converts radians to degrees.
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Converts millimeters to meters.
pub fn millimeters_to_meters(mm: f64) -> f64 {
    mm / 1000.0
}

/// Converts meters to millimeters.
pub fn meters_to_millimeters(m: f64) -> f64 {
    m * 1000.0
}

/// Converts a joint-angle vector from degrees to radians.
///
/// No wrapping or clamping is applied; `350°` stays `350°` in radians.
pub fn pose_from_degrees(angles_deg: &[f64]) -> Vec<f64> {
    angles_deg.iter().copied().map(degrees_to_radians).collect()
}
