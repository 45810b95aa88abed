mod common;

use common::synthetic_session::{jitter, repeated_sweep};
use refraction_engine::controller::{ControllerEvent, SampleOutcome};
use refraction_engine::fit::FitMethod;
use refraction_engine::prelude::*;
use refraction_engine::AcquisitionState;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn controller() -> AcquisitionController {
    AcquisitionController::new(DeviceCapabilities::default(), EngineParams::default())
        .expect("default configuration is valid")
}

/// Feeds every reading and collects the outcomes.
fn feed(controller: &mut AcquisitionController, readings: &[(f32, f32)]) -> Vec<SampleOutcome> {
    readings
        .iter()
        .map(|&(angle, power)| controller.add_result(angle, power).unwrap())
        .collect()
}

#[test]
fn noisy_session_completes_with_truth() {
    init_logging();
    let truth = AstigmaticPrescription::new(-2.0, -1.5, 30.0);
    let mut c = controller();
    let events = c.subscribe();
    let readings = repeated_sweep(&truth, 18, 3, 0.1);

    let outcomes = feed(&mut c, &readings);
    assert_eq!(c.state(), AcquisitionState::Finished);
    assert_eq!(c.tested_buckets().len(), 18);
    // Completion happens on the first reading of the last meridian.
    assert_eq!(outcomes.last(), Some(&SampleOutcome::Ignored));
    assert_eq!(c.computed().failures(), 0);

    let computed = c.computed();
    assert_eq!(computed.rounded(), Some(truth));
    let fitted = computed.fitted().unwrap();
    assert!((fitted.sphere() - truth.sphere()).abs() < 0.1, "{fitted}");
    assert!((fitted.cylinder() - truth.cylinder()).abs() < 0.1, "{fitted}");
    assert!(computed.accepted().is_none());

    let trace = c.last_trace().unwrap();
    assert_eq!(trace.fit.as_ref().unwrap().method, FitMethod::LeastSquares);
    assert!(trace.outliers.as_ref().unwrap().diagnostics.flagged.is_empty());

    let completed: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, ControllerEvent::Completed { .. }))
        .collect();
    assert_eq!(completed.len(), 1);
}

#[test]
fn spikes_in_one_meridian_are_rejected() {
    init_logging();
    let truth = AstigmaticPrescription::new(-2.0, -1.5, 30.0);
    let mut readings = repeated_sweep(&truth, 18, 3, 0.1);
    // Second and third reading at 50°.
    readings[16].1 += 3.0;
    readings[17].1 += 3.0;

    let mut c = controller();
    feed(&mut c, &readings);
    assert_eq!(c.state(), AcquisitionState::Finished);
    assert_eq!(c.computed().rounded(), Some(truth));

    let flagged: Vec<_> = c
        .computed()
        .snapshot()
        .all_values()
        .into_iter()
        .filter(|m| m.is_outlier)
        .collect();
    // Each spike sits both in its bucket and in the raw sequence.
    assert_eq!(flagged.len(), 4);
    assert!(flagged.iter().all(|m| (m.angle - 50.0).abs() < 1.0));
}

#[test]
fn operator_failures_soften_cylinder() {
    init_logging();
    let truth = AstigmaticPrescription::new(-2.0, -1.5, 30.0);
    let readings = repeated_sweep(&truth, 18, 3, 0.1);
    let mut c = controller();
    feed(&mut c, &readings[..3]);
    for i in 0..30 {
        // Points at the 5° bucket without moving away from 0°.
        let outcome = c.add_result(4.0, truth.power_at(4.0) + jitter(i, 0.1)).unwrap();
        assert_eq!(outcome, SampleOutcome::Failure);
    }
    assert_eq!(c.computed().failures(), 30);
    feed(&mut c, &readings[3..]);
    assert_eq!(c.state(), AcquisitionState::Finished);

    // Score > 1.25: cylinder forced down by 0.25 and halved, half the removed
    // amount moved into the sphere.
    let computed = c.computed();
    assert_eq!(
        computed.rounded(),
        Some(AstigmaticPrescription::new(-2.5, -0.5, 30.0))
    );
    assert_eq!(computed.softened(), computed.rounded());
}

#[test]
fn presbyope_gets_reading_add_on_completion() {
    init_logging();
    let truth = AstigmaticPrescription::spherical(-1.0);
    let patient = PatientProfile {
        current: None,
        using_glasses: false,
        usage: Usage::Near,
        age: 50,
    };
    let mut c = controller().with_patient(patient);
    feed(&mut c, &repeated_sweep(&truth, 18, 2, 0.05));
    let accepted = c.computed().accepted().unwrap();
    assert_eq!(accepted.sphere(), -1.0);
    assert_eq!(accepted.cylinder(), 0.0);
    assert_eq!(accepted.add(), 1.75);
}

#[test]
fn two_meridians_fall_back_to_spherical_mean() {
    init_logging();
    let mut c = controller();
    c.add_result(0.0, -1.0).unwrap();
    c.add_result(90.0, -2.0).unwrap();
    let report = c.update_fit_and_round_with_diagnostics();
    let fit = report.trace.fit.unwrap();
    assert_eq!(fit.method, FitMethod::SphericalMean);
    assert!((fit.prescription.sphere() + 1.5).abs() < 1e-5);
    assert!(report.trace.outliers.unwrap().diagnostics.skipped_insufficient);
    assert_eq!(report.record.rounded.map(|r| r.cylinder()), Some(0.0));
    assert_eq!(report.record.rounded.map(|r| r.sphere()), Some(-1.5));
}

#[test]
fn explicit_updates_notify_subscribers() {
    init_logging();
    let truth = AstigmaticPrescription::new(-0.5, -0.75, 100.0);
    let mut c = controller();
    let events = c.subscribe();
    feed(&mut c, &repeated_sweep(&truth, 6, 2, 0.0));
    assert_eq!(c.state(), AcquisitionState::BucketActive { key: 15000 });
    assert!(!c.check_if_done());

    let rounded = c.update_fit_and_round();
    assert_eq!(rounded, Some(truth));
    let patient = PatientProfile {
        current: Some(AstigmaticPrescription::spherical(-0.5)),
        using_glasses: true,
        usage: Usage::Far,
        age: 30,
    };
    let accepted = c.update_fit_and_acceptance(&patient).unwrap();
    // 0.75 more cylinder than worn: one step less.
    assert_eq!(accepted, AstigmaticPrescription::new(-0.5, -0.5, 100.0));

    let updates = events
        .try_iter()
        .filter(|e| matches!(e, ControllerEvent::PrescriptionUpdated { .. }))
        .count();
    assert_eq!(updates, 2);
}
