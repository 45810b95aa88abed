//! Fixed bucket grid the controller snaps readings onto.

use super::params::DeviceCapabilities;
use crate::angle::{closest_key, key_distance, key_to_degrees, normalize_periodic, quantize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq)]
pub struct BucketGrid {
    keys: Vec<i32>,
    period: f32,
}

impl BucketGrid {
    /// Lays buckets at half the device step over its angle range. An end of
    /// the range that wraps onto the start is not duplicated.
    pub fn for_device(device: &DeviceCapabilities) -> Self {
        let period = device.wrap_period_deg;
        let spacing = 0.5 * device.angle_step_deg;
        let span = device.angle_max_deg - device.angle_min_deg;
        let count = if spacing > 0.0 {
            (span / spacing + 1e-4).floor() as usize + 1
        } else {
            1
        };
        let mut seen = BTreeSet::new();
        let mut keys: Vec<i32> = Vec::with_capacity(count);
        for i in 0..count {
            let angle = device.angle_min_deg + i as f32 * spacing;
            let key = quantize(normalize_periodic(angle, period));
            if seen.insert(key) {
                keys.push(key);
            }
        }
        Self { keys, period }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn keys(&self) -> &[i32] {
        &self.keys
    }

    /// Grid bucket circularly closest to `angle`.
    pub fn closest(&self, angle: f32) -> Option<i32> {
        closest_key(self.keys.iter().copied(), angle, self.period)
    }

    /// Circular distance between two bucket keys, in degrees.
    pub fn distance_deg(&self, a: i32, b: i32) -> f32 {
        key_to_degrees(key_distance(a, b, self.period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_step_grid_over_optical_range() {
        let grid = BucketGrid::for_device(&DeviceCapabilities::default());
        // 0, 5, ..., 175; 180 folds onto 0.
        assert_eq!(grid.len(), 36);
        assert_eq!(grid.keys()[1], 500);
        assert_eq!(grid.closest(178.0), Some(0));
        assert_eq!(grid.closest(176.0), Some(17500));
        assert_eq!(grid.distance_deg(0, 17500), 5.0);
    }

    #[test]
    fn full_turn_device() {
        let device = DeviceCapabilities {
            angle_max_deg: 360.0,
            angle_step_deg: 30.0,
            wrap_period_deg: 360.0,
            ..Default::default()
        };
        let grid = BucketGrid::for_device(&device);
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.closest(359.0), Some(0));
        assert_eq!(grid.closest(190.0), Some(19500));
        assert_eq!(grid.distance_deg(0, 34500), 15.0);
    }

    #[test]
    fn partial_range_keeps_both_ends() {
        let device = DeviceCapabilities {
            angle_min_deg: 30.0,
            angle_max_deg: 150.0,
            angle_step_deg: 20.0,
            ..Default::default()
        };
        let grid = BucketGrid::for_device(&device);
        assert_eq!(grid.keys().first(), Some(&3000));
        assert_eq!(grid.keys().last(), Some(&15000));
        assert_eq!(grid.len(), 13);
    }
}
