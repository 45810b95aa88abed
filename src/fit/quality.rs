//! Fit quality statistics.
//!
//! The score grows with both a poorer numeric fit and with more operator
//! failures during acquisition, so a higher score means a less trustworthy
//! cylinder.

use super::QualityParams;
use crate::prescription::AstigmaticPrescription;
use crate::types::MeasuredMeridian;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitQuality {
    pub mean_squared_residual: f32,
    pub rms_residual: f32,
    pub samples: usize,
    pub failures: u32,
    pub score: f32,
}

/// `Σ(predicted − measured)² / n` over non-outlier readings.
pub fn mean_squared_residual(
    rx: &AstigmaticPrescription,
    samples: &[MeasuredMeridian],
) -> Option<f32> {
    let (sum, n) = samples
        .iter()
        .filter(|m| !m.is_outlier)
        .fold((0.0f64, 0usize), |(sum, n), m| {
            let r = m.residual(rx) as f64;
            (sum + r * r, n + 1)
        });
    if n == 0 {
        None
    } else {
        Some((sum / n as f64) as f32)
    }
}

/// Normalized quality-of-fit score: `√msr / reference_rms + failure_weight · failures`.
pub fn quality_of_fit(msr: f32, failures: u32, params: &QualityParams) -> f32 {
    let rms = msr.max(0.0).sqrt();
    rms / params.reference_rms_d.max(1e-6) + params.failure_weight * failures as f32
}

/// Computes both statistics for `rx` against `samples`.
pub fn assess_fit(
    rx: &AstigmaticPrescription,
    samples: &[MeasuredMeridian],
    failures: u32,
    params: &QualityParams,
) -> Option<FitQuality> {
    let msr = mean_squared_residual(rx, samples)?;
    Some(FitQuality {
        mean_squared_residual: msr,
        rms_residual: msr.sqrt(),
        samples: samples.iter().filter(|m| !m.is_outlier).count(),
        failures,
        score: quality_of_fit(msr, failures, params),
    })
}
