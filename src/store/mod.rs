//! Angle-bucketed measurement store.
//!
//! Readings are keyed by their quantized angle (`round(angle * 100)`). Each
//! bucket keeps the latest reading plus a bounded history, and every reading
//! is also appended to a raw, time-ordered sequence. Fitting consumes the
//! union of both through [`MeridianStore::all_values`].
//!
//! The store itself is a plain owned structure. Cross-thread access goes
//! through the single mutex held by [`crate::computed::ComputedPrescription`].

pub mod history;

use crate::angle::{closest_key, quantize, HALF_TURN_DEG};
use crate::types::MeasuredMeridian;
pub use history::{BoundedHistory, HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest value and recent history for one quantized angle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub current: MeasuredMeridian,
    pub history: BoundedHistory<MeasuredMeridian>,
}

impl Bucket {
    fn new(first: MeasuredMeridian) -> Self {
        let mut history = BoundedHistory::default();
        history.push(first);
        Self {
            current: first,
            history,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeridianStore {
    buckets: BTreeMap<i32, Bucket>,
    raw: Vec<MeasuredMeridian>,
}

impl MeridianStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reading. Returns the bucket key it landed in.
    pub fn insert(&mut self, angle: f32, power: f32) -> i32 {
        let value = MeasuredMeridian::new(angle, power);
        let key = quantize(value.angle);
        match self.buckets.get_mut(&key) {
            Some(bucket) => {
                bucket.current = value;
                bucket.history.push(value);
            }
            None => {
                self.buckets.insert(key, Bucket::new(value));
            }
        }
        self.raw.push(value);
        key
    }

    /// Bucket whose key is circularly closest to `angle` for the given wrap
    /// period (180° for optical meridians, 360° for raw device angles).
    pub fn closest_bucket(&self, angle: f32, period: f32) -> Option<i32> {
        closest_key(self.buckets.keys().copied(), angle, period)
    }

    /// Closest bucket under the optical (180°) period.
    pub fn closest_meridian(&self, angle: f32) -> Option<i32> {
        self.closest_bucket(angle, HALF_TURN_DEG)
    }

    /// Bucket currents in key order followed by the raw sequence.
    pub fn all_values(&self) -> Vec<MeasuredMeridian> {
        let mut out = Vec::with_capacity(self.buckets.len() + self.raw.len());
        out.extend(self.buckets.values().map(|b| b.current));
        out.extend(self.raw.iter().copied());
        out
    }

    /// Writes outlier flags computed over an [`Self::all_values`] copy back
    /// into the store. `flags` must be index-aligned with that copy; a
    /// mismatched length means the store changed since the copy was taken and
    /// the flags are discarded.
    pub fn apply_outlier_flags(&mut self, flags: &[bool]) -> bool {
        if flags.len() != self.buckets.len() + self.raw.len() {
            return false;
        }
        let (bucket_flags, raw_flags) = flags.split_at(self.buckets.len());
        for (bucket, &flag) in self.buckets.values_mut().zip(bucket_flags) {
            bucket.current.is_outlier = flag;
        }
        for (value, &flag) in self.raw.iter_mut().zip(raw_flags) {
            value.is_outlier = flag;
        }
        true
    }

    pub fn current(&self, key: i32) -> Option<&MeasuredMeridian> {
        self.buckets.get(&key).map(|b| &b.current)
    }

    pub fn history(&self, key: i32) -> Option<&BoundedHistory<MeasuredMeridian>> {
        self.buckets.get(&key).map(|b| &b.history)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of raw readings recorded.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[MeasuredMeridian] {
        &self.raw
    }
}
