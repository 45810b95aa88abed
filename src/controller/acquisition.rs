//! Acquisition state machine for one eye.
//!
//! Readings are snapped onto a fixed [`BucketGrid`]. The active bucket only
//! changes when the reading points at a bucket more than
//! `transition_min_deg` away *and* the operator has moved more than
//! `movement_min_deg` since entering the active bucket. Readings that point
//! elsewhere without enough movement count as operator failures and are
//! dropped. Once enough distinct buckets hold readings, the pipeline runs
//! and the controller finishes.

use super::events::ControllerEvent;
use super::grid::BucketGrid;
use super::params::DeviceCapabilities;
use super::pipeline::{run_pipeline, run_with_report};
use crate::angle::{circular_distance, key_to_degrees, HALF_TURN_DEG};
use crate::computed::ComputedPrescription;
use crate::config::EngineParams;
use crate::diagnostics::{PipelineTrace, RefractionReport};
use crate::error::{check_sample, Result};
use crate::prescription::AstigmaticPrescription;
use crate::types::PatientProfile;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AcquisitionState {
    Idle,
    BucketActive { key: i32 },
    Finished,
}

/// What happened to one reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Stored in the active bucket.
    Recorded { key: i32 },
    /// Moved to a new bucket and stored there.
    Entered { key: i32 },
    /// Pointed at another bucket without enough movement.
    Failure,
    /// The controller already finished.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TestedBucket {
    last_visit: u64,
    last_power: f32,
}

pub struct AcquisitionController {
    device: DeviceCapabilities,
    params: EngineParams,
    grid: BucketGrid,
    computed: Arc<ComputedPrescription>,
    patient: Option<PatientProfile>,
    state: AcquisitionState,
    entry_angle: f32,
    start_power: f32,
    visits: u64,
    tested: BTreeMap<i32, TestedBucket>,
    subscribers: Vec<Sender<ControllerEvent>>,
    last_trace: Option<PipelineTrace>,
}

impl AcquisitionController {
    pub fn new(device: DeviceCapabilities, params: EngineParams) -> Result<Self> {
        Self::with_computed(device, params, Arc::new(ComputedPrescription::new()))
    }

    /// Controller over an existing aggregate, e.g. one shared with a sample
    /// producer.
    pub fn with_computed(
        device: DeviceCapabilities,
        params: EngineParams,
        computed: Arc<ComputedPrescription>,
    ) -> Result<Self> {
        device.validate()?;
        params.validate()?;
        let grid = BucketGrid::for_device(&device);
        debug!(
            "controller: device {} with {} bucket(s), period {}",
            device.name,
            grid.len(),
            grid.period()
        );
        Ok(Self {
            start_power: device.default_start_power,
            device,
            params,
            grid,
            computed,
            patient: None,
            state: AcquisitionState::Idle,
            entry_angle: 0.0,
            visits: 0,
            tested: BTreeMap::new(),
            subscribers: Vec::new(),
            last_trace: None,
        })
    }

    /// Patient used for acceptance when the eye completes.
    pub fn with_patient(mut self, patient: PatientProfile) -> Self {
        self.patient = Some(patient);
        self
    }

    pub fn set_patient(&mut self, patient: Option<PatientProfile>) {
        self.patient = patient;
    }

    pub fn computed(&self) -> Arc<ComputedPrescription> {
        Arc::clone(&self.computed)
    }

    pub fn device(&self) -> &DeviceCapabilities {
        &self.device
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn grid(&self) -> &BucketGrid {
        &self.grid
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Starting power suggested for the active bucket.
    pub fn start_power(&self) -> f32 {
        self.start_power
    }

    /// Buckets holding at least one reading, in key order.
    pub fn tested_buckets(&self) -> Vec<i32> {
        self.tested.keys().copied().collect()
    }

    pub fn last_trace(&self) -> Option<&PipelineTrace> {
        self.last_trace.as_ref()
    }

    /// New channel receiving every subsequent [`ControllerEvent`].
    pub fn subscribe(&mut self) -> Receiver<ControllerEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Feeds one reading through the state machine.
    pub fn add_result(&mut self, angle: f32, power: f32) -> Result<SampleOutcome> {
        check_sample(angle, power)?;
        let Some(closest) = self.grid.closest(angle) else {
            return Ok(SampleOutcome::Ignored);
        };

        match self.state {
            AcquisitionState::BucketActive { key } if key == closest => {
                self.record(key, angle, power)?;
                Ok(SampleOutcome::Recorded { key })
            }
            AcquisitionState::BucketActive { key } => {
                let bucket_gap = self.grid.distance_deg(key, closest);
                let movement = circular_distance(angle, self.entry_angle, self.grid.period());
                let acq = &self.params.acquisition;
                if bucket_gap > acq.transition_min_deg && movement > acq.movement_min_deg {
                    self.enter(closest, angle);
                    self.record(closest, angle, power)?;
                    self.check_completion();
                    Ok(SampleOutcome::Entered { key: closest })
                } else {
                    let failures = self.computed.record_failure();
                    debug!(
                        "controller: reading at {angle:.2} points to bucket {closest} but moved only {movement:.2}°, failures={failures}"
                    );
                    self.emit(ControllerEvent::AlignmentFailure { angle, failures });
                    Ok(SampleOutcome::Failure)
                }
            }
            AcquisitionState::Idle => {
                self.enter(closest, angle);
                self.record(closest, angle, power)?;
                self.check_completion();
                Ok(SampleOutcome::Entered { key: closest })
            }
            AcquisitionState::Finished => Ok(SampleOutcome::Ignored),
        }
    }

    /// Makes the bucket closest to `angle` active without a reading and
    /// without counting a failure.
    pub fn set_working_meridian(&mut self, angle: f32) -> Result<Option<i32>> {
        check_sample(angle, 0.0)?;
        if self.state == AcquisitionState::Finished {
            return Ok(None);
        }
        let Some(key) = self.grid.closest(angle) else {
            return Ok(None);
        };
        self.enter(key, angle);
        Ok(Some(key))
    }

    fn enter(&mut self, key: i32, angle: f32) {
        self.visits += 1;
        self.state = AcquisitionState::BucketActive { key };
        self.entry_angle = angle;
        self.start_power = self.inherited_start_power(key);
        if let Some(bucket) = self.tested.get_mut(&key) {
            bucket.last_visit = self.visits;
        }
        debug!(
            "controller: entered bucket {key} at {angle:.2}°, start power {:.2}",
            self.start_power
        );
        self.emit(ControllerEvent::BucketEntered {
            key,
            angle: key_to_degrees(key),
            start_power: self.start_power,
        });
    }

    fn record(&mut self, key: i32, angle: f32, power: f32) -> Result<()> {
        self.computed.add_result(angle, power)?;
        let visit = self.visits;
        self.tested
            .entry(key)
            .and_modify(|b| {
                b.last_visit = visit;
                b.last_power = power;
            })
            .or_insert(TestedBucket {
                last_visit: visit,
                last_power: power,
            });
        self.emit(ControllerEvent::SampleRecorded { key, angle, power });
        Ok(())
    }

    /// Power of the most recently visited tested bucket within
    /// `inherit_within_deg` (modulo 180), else the device default.
    fn inherited_start_power(&self, key: i32) -> f32 {
        let target = key_to_degrees(key);
        let limit = self.params.acquisition.inherit_within_deg;
        self.tested
            .iter()
            .filter(|(&k, _)| {
                circular_distance(key_to_degrees(k), target, HALF_TURN_DEG) <= limit
            })
            .max_by_key(|(_, b)| b.last_visit)
            .map(|(_, b)| b.last_power)
            .unwrap_or(self.device.default_start_power)
    }

    pub fn number_of_meridians_required_to_complete(&self) -> usize {
        self.device
            .required_meridians
            .unwrap_or_else(|| self.grid.len().div_ceil(2))
    }

    /// True once enough distinct buckets hold readings.
    pub fn check_if_done(&self) -> bool {
        self.state == AcquisitionState::Finished
            || self.tested.len() >= self.number_of_meridians_required_to_complete()
    }

    pub fn is_doing_rough_alignment_first(&self) -> bool {
        self.device.rough_alignment_first && self.tested.is_empty()
    }

    fn check_completion(&mut self) {
        if self.state == AcquisitionState::Finished || !self.check_if_done() {
            return;
        }
        self.state = AcquisitionState::Finished;
        let trace = run_pipeline(&self.computed, &self.params, self.patient.as_ref());
        self.last_trace = Some(trace);
        let rounded = self.computed.rounded();
        let accepted = self.computed.accepted();
        info!(
            "controller: finished after {} bucket(s), {} failure(s), rounded={}",
            self.tested.len(),
            self.computed.failures(),
            rounded.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
        );
        self.emit(ControllerEvent::Completed {
            tested: self.tested.len(),
            rounded,
            accepted,
        });
    }

    /// Reruns fit, outlier rejection and rounding. Returns the rounded
    /// prescription.
    pub fn update_fit_and_round(&mut self) -> Option<AstigmaticPrescription> {
        let trace = run_pipeline(&self.computed, &self.params, None);
        self.finish_update(trace);
        self.computed.rounded()
    }

    /// Same as [`Self::update_fit_and_round`] but returns the full report.
    pub fn update_fit_and_round_with_diagnostics(&mut self) -> RefractionReport {
        let report = run_with_report(&self.computed, &self.params, None);
        self.finish_update(report.trace.clone());
        report
    }

    /// Reruns the pipeline including acceptance for `patient`. Returns the
    /// accepted prescription.
    pub fn update_fit_and_acceptance(
        &mut self,
        patient: &PatientProfile,
    ) -> Option<AstigmaticPrescription> {
        let trace = run_pipeline(&self.computed, &self.params, Some(patient));
        self.finish_update(trace);
        self.computed.accepted()
    }

    fn finish_update(&mut self, trace: PipelineTrace) {
        self.last_trace = Some(trace);
        let event = ControllerEvent::PrescriptionUpdated {
            rounded: self.computed.rounded(),
            accepted: self.computed.accepted(),
        };
        self.emit(event);
    }
}
