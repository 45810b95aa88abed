//! Fit → outlier rejection → rounding/softening → acceptance.
//!
//! Runs on a copy of the aggregate taken under its lock. Outlier flags from
//! the previous run are cleared on the copy first, so every run starts from
//! the full set of readings. Results go back in a single critical section.

use crate::acceptance::accept;
use crate::computed::{ComputedPrescription, PipelineResults};
use crate::config::EngineParams;
use crate::diagnostics::{
    elapsed_ms, AcceptanceStage, FitStage, OutlierStage, PipelineStage, PipelineTrace,
    RefractionReport, RoundingStage, SofteningStage,
};
use crate::fit::{assess_fit, fit_prescription, remove_outliers};
use crate::prescription::AstigmaticPrescription;
use crate::rounding::round_prescription;
use crate::types::PatientProfile;
use log::{debug, warn};
use std::time::Instant;

/// Runs the pipeline on `computed` and stores the fitted, softened and
/// rounded snapshots. With a `patient`, the accepted snapshot is replaced
/// as well.
pub fn run_pipeline(
    computed: &ComputedPrescription,
    params: &EngineParams,
    patient: Option<&PatientProfile>,
) -> PipelineTrace {
    let total_start = Instant::now();
    let mut trace = PipelineTrace::default();
    let (mut values, failures) = computed.fit_input();
    for value in &mut values {
        value.is_outlier = false;
    }

    let fit_start = Instant::now();
    let initial = fit_prescription(&values, &params.fit);
    let fit_ms = trace.timings.record(PipelineStage::Fit, fit_start);
    if let Some(fit) = &initial {
        trace.fit = Some(FitStage {
            elapsed_ms: fit_ms,
            method: fit.method,
            samples_used: fit.samples_used,
            distinct_meridians: fit.distinct_meridians,
            prescription: fit.prescription,
        });
    }

    let outlier_start = Instant::now();
    let (fitted, outlier_diag) = remove_outliers(
        initial.map(|f| f.prescription),
        &mut values,
        failures,
        &params.fit,
        &params.outliers,
    );
    let outlier_ms = trace.timings.record(PipelineStage::Outliers, outlier_start);
    trace.outliers = Some(OutlierStage {
        elapsed_ms: outlier_ms,
        failures,
        diagnostics: outlier_diag,
        refit: fitted,
    });

    let rounding_start = Instant::now();
    let quality = fitted.and_then(|rx| assess_fit(&rx, &values, failures, &params.quality));
    let score = quality.as_ref().map(|q| q.score).unwrap_or(0.0);
    let outcome = round_prescription(fitted.as_ref(), &values, score, &params.rounding);
    let rounding_ms = trace.timings.record(PipelineStage::Rounding, rounding_start);

    let (softened, rounded) = match outcome {
        Some(out) => {
            let diag = out.diagnostics;
            trace.softening = Some(SofteningStage {
                score: diag.softening.score,
                action: diag.softening.action,
                before: diag.softening.before,
                after: diag.softening.after,
            });
            trace.rounding = Some(RoundingStage {
                elapsed_ms: rounding_ms,
                quality,
                step: params.rounding.step,
                stepped: diag.stepped,
                se_drift: diag.se_drift,
                se_nudge: diag.se_nudge,
                zeroed: diag.zeroed,
                rounded: out.rounded,
            });
            (Some(out.softened), Some(out.rounded))
        }
        None => (None, None),
    };

    let applied = computed.store_results(&PipelineResults {
        fitted,
        softened,
        rounded,
        outlier_flags: values.iter().map(|m| m.is_outlier).collect(),
    });
    if !applied {
        warn!("pipeline: readings changed during the run, outlier flags not stored");
    }

    if let Some(patient) = patient {
        let acceptance_start = Instant::now();
        let stage = run_acceptance(computed, rounded.as_ref(), patient, failures, params);
        if stage.is_some() {
            trace.timings.record(PipelineStage::Acceptance, acceptance_start);
        }
        trace.acceptance = stage;
    }

    trace.timings.finish(total_start);
    debug!(
        "pipeline: {} reading(s), failures={}, rounded={:?}, {:.3} ms",
        values.len(),
        failures,
        rounded.map(|r| r.to_string()),
        trace.timings.total_ms
    );
    trace
}

fn run_acceptance(
    computed: &ComputedPrescription,
    rounded: Option<&AstigmaticPrescription>,
    patient: &PatientProfile,
    failures: u32,
    params: &EngineParams,
) -> Option<AcceptanceStage> {
    let Some(rounded) = rounded else {
        computed.set_accepted(None);
        return None;
    };
    let start = Instant::now();
    let (accepted, diagnostics) = accept(rounded, patient, failures, &params.acceptance);
    computed.set_accepted(Some(accepted));
    Some(AcceptanceStage {
        elapsed_ms: elapsed_ms(start),
        failures,
        age: patient.age,
        diagnostics,
    })
}

/// Runs the pipeline and pairs the resulting record with its trace.
pub fn run_with_report(
    computed: &ComputedPrescription,
    params: &EngineParams,
    patient: Option<&PatientProfile>,
) -> RefractionReport {
    let trace = run_pipeline(computed, params, patient);
    RefractionReport {
        record: computed.snapshot(),
        trace,
    }
}

/// Report for a record without rerunning anything.
pub fn report_without_run(computed: &ComputedPrescription) -> RefractionReport {
    RefractionReport {
        record: computed.snapshot(),
        trace: PipelineTrace::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Usage;

    fn fill(computed: &ComputedPrescription, rx: &AstigmaticPrescription, count: usize) {
        for i in 0..count {
            let angle = i as f32 * 180.0 / count as f32;
            computed.add_result(angle, rx.power_at(angle)).unwrap();
        }
    }

    #[test]
    fn empty_aggregate_yields_no_snapshots() {
        let computed = ComputedPrescription::new();
        let trace = run_pipeline(&computed, &EngineParams::default(), None);
        assert!(trace.fit.is_none());
        assert!(trace.rounding.is_none());
        assert_eq!(computed.fitted(), None);
        assert_eq!(computed.rounded(), None);
    }

    #[test]
    fn clean_session_round_trips_truth() {
        let truth = AstigmaticPrescription::new(-2.0, -1.0, 90.0);
        let computed = ComputedPrescription::new();
        fill(&computed, &truth, 12);
        let trace = run_pipeline(&computed, &EngineParams::default(), None);
        assert_eq!(computed.rounded(), Some(truth));
        assert!(trace.outliers.unwrap().diagnostics.flagged.is_empty());
        assert!(trace.timings.ran(PipelineStage::Fit));
        assert!(trace.timings.ran(PipelineStage::Rounding));
        assert!(!trace.timings.ran(PipelineStage::Acceptance));
        assert_eq!(computed.accepted(), None);
    }

    #[test]
    fn spike_is_flagged_in_the_store() {
        let truth = AstigmaticPrescription::new(-1.0, -0.75, 20.0);
        let computed = ComputedPrescription::new();
        fill(&computed, &truth, 12);
        computed.add_result(47.0, truth.power_at(47.0) + 4.0).unwrap();
        let trace = run_pipeline(&computed, &EngineParams::default(), None);
        let outliers = trace.outliers.unwrap();
        assert!(!outliers.diagnostics.flagged.is_empty());
        let flagged: Vec<_> = computed
            .snapshot()
            .all_values()
            .into_iter()
            .filter(|m| m.is_outlier)
            .collect();
        assert!(flagged.iter().all(|m| (m.angle - 47.0).abs() < 1e-3));
        let fitted = computed.fitted().unwrap();
        assert!((fitted.sphere() - truth.sphere()).abs() < 0.05, "{fitted}");
    }

    #[test]
    fn patient_profile_drives_acceptance() {
        let truth = AstigmaticPrescription::spherical(-3.0);
        let computed = ComputedPrescription::new();
        fill(&computed, &truth, 10);
        let patient = PatientProfile {
            current: Some(AstigmaticPrescription::spherical(-1.0)),
            using_glasses: true,
            usage: Usage::Far,
            age: 25,
        };
        let report = run_with_report(&computed, &EngineParams::default(), Some(&patient));
        assert_eq!(report.record.rounded.map(|r| r.sphere()), Some(-3.0));
        assert_eq!(report.record.accepted.map(|r| r.sphere()), Some(-2.75));
        assert!(report.trace.acceptance.is_some());
        assert!(report.trace.timings.ran(PipelineStage::Acceptance));
    }
}
