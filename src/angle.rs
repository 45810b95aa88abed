//! Angle utilities shared by the store, the fitter and the controller.
//!
//! Meridian angles arrive in degrees over a full turn. Optical power repeats
//! every 180°, so axis values live in [0, 180) while raw meridians are kept in
//! [0, 360). Bucket keys are the angle in hundredths of a degree.

/// Degrees per half turn; period of optical power around the eye.
pub const HALF_TURN_DEG: f32 = 180.0;
/// Degrees per full turn.
pub const FULL_TURN_DEG: f32 = 360.0;
/// Bucket keys store the angle in units of 0.01°.
pub const KEY_SCALE: f32 = 100.0;

/// Folds `angle` into `[0, period)`, snapping values that round up to the
/// period back to zero.
#[inline]
pub fn normalize_periodic(angle: f32, period: f32) -> f32 {
    let mut norm = angle.rem_euclid(period);
    if norm >= period {
        norm -= period;
    }
    if norm >= period - 1e-4 {
        0.0
    } else {
        norm
    }
}

/// Normalizes an axis into the range [0, 180).
#[inline]
pub fn normalize_axis(angle: f32) -> f32 {
    normalize_periodic(angle, HALF_TURN_DEG)
}

/// Normalizes a measured meridian into the range [0, 360).
#[inline]
pub fn normalize_meridian(angle: f32) -> f32 {
    normalize_periodic(angle, FULL_TURN_DEG)
}

/// Smallest unsigned distance between two angles on a circle of `period`
/// degrees. Returns a value in `[0, period / 2]`.
#[inline]
pub fn circular_distance(a: f32, b: f32, period: f32) -> f32 {
    let diff = (a - b).abs().rem_euclid(period);
    if diff > 0.5 * period {
        period - diff
    } else {
        diff
    }
}

/// Quantizes an angle (degrees) into an integer bucket key.
///
/// The key is `round(angle * 100)`, which keeps 0.01° resolution while
/// absorbing floating point jitter in repeated readings of the same meridian.
#[inline]
pub fn quantize(angle: f32) -> i32 {
    (angle * KEY_SCALE).round() as i32
}

/// Converts a bucket key back to degrees.
#[inline]
pub fn key_to_degrees(key: i32) -> f32 {
    key as f32 / KEY_SCALE
}

/// Circular distance between two bucket keys for a wrap `period` in degrees.
#[inline]
pub fn key_distance(a: i32, b: i32, period: f32) -> i32 {
    let period_keys = quantize(period);
    let diff = (a - b).abs().rem_euclid(period_keys);
    diff.min(period_keys - diff)
}

/// Returns the key from `keys` with the smallest circular distance to
/// `angle`. Ties resolve to the first key in iteration order.
pub fn closest_key<I>(keys: I, angle: f32, period: f32) -> Option<i32>
where
    I: IntoIterator<Item = i32>,
{
    let target = quantize(normalize_periodic(angle, period));
    let mut best: Option<(i32, i32)> = None;
    for key in keys {
        let dist = key_distance(key, target, period);
        match best {
            Some((_, best_dist)) if best_dist <= dist => {}
            _ => best = Some((key, dist)),
        }
    }
    best.map(|(key, _)| key)
}
