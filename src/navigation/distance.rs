/// Returned when a distance cannot be estimated.
pub const INVALID_DISTANCE: f32 = -1.0;

/// Pinhole estimate `real_height_m * focal_length_px / pixel_height`, in
/// meters, or [`INVALID_DISTANCE`] when any input is not positive.
pub fn estimate_distance(focal_length_px: f32, real_height_m: f32, pixel_height: f32) -> f32 {
    if focal_length_px <= 0.0 || real_height_m <= 0.0 || pixel_height <= 0.0 {
        return INVALID_DISTANCE;
    }
    real_height_m * focal_length_px / pixel_height
}

pub fn is_valid_distance(distance: f32) -> bool {
    distance.is_finite() && distance > 0.0
}

/// Whole steps needed to cover `distance_m`.
pub fn steps_for_distance(distance_m: f32, step_length_m: f32) -> u32 {
    if step_length_m <= 0.0 || !is_valid_distance(distance_m) {
        return 0;
    }
    (distance_m / step_length_m).floor() as u32
}
