//! Iterative residual-based outlier rejection.
//!
//! Each round flags the single reading with the largest residual against the
//! current fit and refits. A round stops when the worst residual is within
//! the expected noise: the larger of a fixed floor and a multiple of the RMS
//! of the other inliers. Readings are flagged, never removed.
//!
//! With `min_samples` or fewer readings the pass is a no-op: there is not
//! enough data to separate noise from signal.

use super::meridian::fit_prescription;
use super::{FitParams, OutlierParams};
use crate::prescription::AstigmaticPrescription;
use crate::types::MeasuredMeridian;
use log::debug;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedSample {
    pub index: usize,
    pub angle: f32,
    pub power: f32,
    pub residual: f32,
    pub threshold: f32,
}

/// Diagnostics emitted by the outlier pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDiagnostics {
    pub total: usize,
    pub skipped_insufficient: bool,
    pub max_outliers: usize,
    pub flagged: Vec<FlaggedSample>,
    pub iterations: usize,
}

/// Flags outliers in `samples` and returns the refit prescription.
///
/// `fit` is the prescription obtained from the same samples. Flags already
/// present in `samples` are kept. The failure counter widens the budget of
/// readings that may be rejected.
pub fn remove_outliers(
    fit: Option<AstigmaticPrescription>,
    samples: &mut [MeasuredMeridian],
    failures: u32,
    fit_params: &FitParams,
    params: &OutlierParams,
) -> (Option<AstigmaticPrescription>, OutlierDiagnostics) {
    let mut diag = OutlierDiagnostics {
        total: samples.len(),
        ..Default::default()
    };
    let Some(mut current) = fit else {
        return (None, diag);
    };
    if samples.len() < params.min_samples {
        diag.skipped_insufficient = true;
        debug!(
            "outliers: {} reading(s) < {}, skipping",
            samples.len(),
            params.min_samples
        );
        return (Some(current), diag);
    }

    let fraction = (params.max_outlier_fraction + params.fraction_per_failure * failures as f32)
        .min(params.max_fraction_cap)
        .max(0.0);
    diag.max_outliers = (samples.len() as f32 * fraction + 1e-3).floor() as usize;
    let mut flagged = samples.iter().filter(|m| m.is_outlier).count();

    while flagged < diag.max_outliers {
        let inliers = samples.len() - flagged;
        if inliers <= params.min_inliers {
            break;
        }
        diag.iterations += 1;
        let Some((worst_idx, worst_residual, others_rms)) = worst_residual(samples, &current)
        else {
            break;
        };
        let threshold = params.noise_floor_d.max(params.sigma_factor * others_rms);
        if worst_residual.abs() <= threshold {
            break;
        }
        let sample = &mut samples[worst_idx];
        sample.is_outlier = true;
        flagged += 1;
        debug!(
            "outliers: flagged #{} angle={:.2} power={:.2} residual={:.3} > {:.3}",
            worst_idx, sample.angle, sample.power, worst_residual, threshold
        );
        diag.flagged.push(FlaggedSample {
            index: worst_idx,
            angle: sample.angle,
            power: sample.power,
            residual: worst_residual,
            threshold,
        });
        match fit_prescription(samples, fit_params) {
            Some(refit) => current = refit.prescription,
            None => break,
        }
    }
    (Some(current), diag)
}

/// Index and signed residual of the worst inlier, plus the RMS residual of
/// the remaining inliers.
fn worst_residual(
    samples: &[MeasuredMeridian],
    rx: &AstigmaticPrescription,
) -> Option<(usize, f32, f32)> {
    let mut worst: Option<(usize, f32)> = None;
    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    for (idx, m) in samples.iter().enumerate() {
        if m.is_outlier {
            continue;
        }
        let r = m.residual(rx);
        sum_sq += (r as f64) * (r as f64);
        n += 1;
        match worst {
            Some((_, w)) if w.abs() >= r.abs() => {}
            _ => worst = Some((idx, r)),
        }
    }
    let (idx, r) = worst?;
    let rest = n.saturating_sub(1);
    let others_rms = if rest == 0 {
        0.0
    } else {
        (((sum_sq - (r as f64) * (r as f64)).max(0.0)) / rest as f64).sqrt() as f32
    };
    Some((idx, r, others_rms))
}
