//! Per-eye aggregate of readings and derived prescriptions.
//!
//! [`ComputedPrescription`] wraps a [`PrescriptionRecord`] in a single mutex
//! so a sample producer and the pipeline can share it through an `Arc`.
//! Readers take a copy with [`ComputedPrescription::snapshot`]; fitting runs
//! on that copy and writes its results back in one short critical section.

use crate::error::{check_sample, Result};
use crate::prescription::AstigmaticPrescription;
use crate::store::MeridianStore;
use crate::types::MeasuredMeridian;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Serializable state of one eye.
///
/// The four snapshots are independent: each stage replaces its own and only
/// reads the earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub store: MeridianStore,
    pub failures: u32,
    /// Outlier-filtered continuous fit.
    pub fitted: Option<AstigmaticPrescription>,
    /// Stepped and softened, before equivalent realignment and zeroing.
    pub softened: Option<AstigmaticPrescription>,
    pub rounded: Option<AstigmaticPrescription>,
    pub accepted: Option<AstigmaticPrescription>,
}

impl PrescriptionRecord {
    /// Union of bucket currents and raw readings, see
    /// [`MeridianStore::all_values`].
    pub fn all_values(&self) -> Vec<MeasuredMeridian> {
        self.store.all_values()
    }

    /// Most refined prescription available.
    pub fn best(&self) -> Option<AstigmaticPrescription> {
        self.accepted.or(self.rounded).or(self.fitted)
    }
}

/// Derived results of a pipeline run, written back in one go.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineResults {
    pub fitted: Option<AstigmaticPrescription>,
    pub softened: Option<AstigmaticPrescription>,
    pub rounded: Option<AstigmaticPrescription>,
    /// Outlier flags index-aligned with the copy the pipeline ran on.
    pub outlier_flags: Vec<bool>,
}

#[derive(Debug, Default)]
pub struct ComputedPrescription {
    inner: Mutex<PrescriptionRecord>,
}

impl ComputedPrescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: PrescriptionRecord) -> Self {
        Self {
            inner: Mutex::new(record),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PrescriptionRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and records one reading. Returns the bucket key.
    pub fn add_result(&self, angle: f32, power: f32) -> Result<i32> {
        check_sample(angle, power)?;
        Ok(self.lock().store.insert(angle, power))
    }

    pub fn record_failure(&self) -> u32 {
        let mut record = self.lock();
        record.failures = record.failures.saturating_add(1);
        record.failures
    }

    pub fn failures(&self) -> u32 {
        self.lock().failures
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    /// Copy of the whole record.
    pub fn snapshot(&self) -> PrescriptionRecord {
        self.lock().clone()
    }

    /// Readings to fit plus the failure count, taken under one lock.
    pub fn fit_input(&self) -> (Vec<MeasuredMeridian>, u32) {
        let record = self.lock();
        (record.store.all_values(), record.failures)
    }

    pub fn fitted(&self) -> Option<AstigmaticPrescription> {
        self.lock().fitted
    }

    pub fn softened(&self) -> Option<AstigmaticPrescription> {
        self.lock().softened
    }

    pub fn rounded(&self) -> Option<AstigmaticPrescription> {
        self.lock().rounded
    }

    pub fn accepted(&self) -> Option<AstigmaticPrescription> {
        self.lock().accepted
    }

    pub fn set_fitted(&self, rx: Option<AstigmaticPrescription>) {
        self.lock().fitted = rx;
    }

    pub fn set_softened(&self, rx: Option<AstigmaticPrescription>) {
        self.lock().softened = rx;
    }

    pub fn set_rounded(&self, rx: Option<AstigmaticPrescription>) {
        self.lock().rounded = rx;
    }

    pub fn set_accepted(&self, rx: Option<AstigmaticPrescription>) {
        self.lock().accepted = rx;
    }

    /// Stores pipeline results. Outlier flags are only applied when the store
    /// has not grown since the input was copied; the snapshots are stored
    /// either way. Returns whether the flags were applied.
    pub fn store_results(&self, results: &PipelineResults) -> bool {
        let mut record = self.lock();
        record.fitted = results.fitted;
        record.softened = results.softened;
        record.rounded = results.rounded;
        record.store.apply_outlier_flags(&results.outlier_flags)
    }
}

impl Clone for ComputedPrescription {
    fn clone(&self) -> Self {
        Self::from_record(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefractionError;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn add_result_rejects_nan_without_touching_state() {
        let rx = ComputedPrescription::new();
        assert!(matches!(
            rx.add_result(f32::NAN, -1.0),
            Err(RefractionError::InvalidSample { .. })
        ));
        assert!(rx.is_empty());
        assert_eq!(rx.add_result(12.0, -1.0).unwrap(), 1200);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn snapshots_are_independent() {
        let rx = ComputedPrescription::new();
        let a = AstigmaticPrescription::new(-1.0, -0.5, 10.0);
        rx.set_fitted(Some(a));
        rx.set_rounded(Some(a.with_sphere(-1.25)));
        assert_eq!(rx.fitted(), Some(a));
        assert_eq!(rx.softened(), None);
        assert_eq!(rx.rounded().map(|r| r.sphere()), Some(-1.25));
        assert_eq!(rx.accepted(), None);
        assert_eq!(rx.snapshot().best().map(|r| r.sphere()), Some(-1.25));
    }

    #[test]
    fn stale_flags_are_discarded() {
        let rx = ComputedPrescription::new();
        rx.add_result(0.0, -1.0).unwrap();
        let (values, _) = rx.fit_input();
        rx.add_result(90.0, -2.0).unwrap();
        let applied = rx.store_results(&PipelineResults {
            outlier_flags: vec![true; values.len()],
            ..Default::default()
        });
        assert!(!applied);
        assert!(rx.fit_input().0.iter().all(|m| !m.is_outlier));
    }

    #[test]
    fn concurrent_producers_are_all_recorded() {
        let rx = Arc::new(ComputedPrescription::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let rx = Arc::clone(&rx);
                thread::spawn(move || {
                    for i in 0..50 {
                        rx.add_result((t * 50 + i) as f32, -1.0).unwrap();
                        if i % 10 == 0 {
                            rx.record_failure();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rx.len(), 200);
        assert_eq!(rx.failures(), 20);
    }
}
