//! Curve fitting of power-vs-meridian readings.
//!
//! Overview
//! - [`meridian`] solves the linearized thin-lens model
//!   `P(θ) = a + b·cos 2θ + c·sin 2θ` by SVD least squares and converts the
//!   coefficients back to sphere / cylinder / axis. With too few distinct
//!   meridians it falls back to a spherical mean.
//! - [`outliers`] iteratively flags the worst-residual reading and refits
//!   until the worst residual is within the expected noise. It only engages
//!   once enough readings exist to tell noise from signal.
//! - [`quality`] folds the mean squared residual and the operator failure
//!   count into the single score that gates cylinder softening.

pub mod meridian;
pub mod outliers;
pub mod quality;

pub use meridian::{fit_prescription, FitMethod, MeridianFit};
pub use outliers::{remove_outliers, FlaggedSample, OutlierDiagnostics};
pub use quality::{assess_fit, mean_squared_residual, quality_of_fit, FitQuality};

use serde::{Deserialize, Serialize};

/// Parameters of the least-squares fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Distinct meridians required before the sinusoidal model is solved.
    pub min_distinct_meridians: usize,
    /// Meridians closer than this (degrees, modulo 180) count as one.
    pub meridian_separation_deg: f32,
    /// Singular value cutoff passed to the SVD solver.
    pub svd_eps: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            min_distinct_meridians: 3,
            meridian_separation_deg: 1.0,
            svd_eps: 1e-9,
        }
    }
}

/// Parameters of the iterative residual-based outlier rejection.
///
/// - `min_samples`: the pass is a no-op below this many readings.
/// - `noise_floor_d`: residuals under this are never treated as outliers.
/// - `sigma_factor`: worst residual must exceed this multiple of the RMS of
///   the remaining readings to be flagged.
/// - `max_outlier_fraction` / `fraction_per_failure` / `max_fraction_cap`:
///   budget of flagged readings, loosened by operator failures.
/// - `min_inliers`: never flag below this many remaining readings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierParams {
    pub min_samples: usize,
    pub noise_floor_d: f32,
    pub sigma_factor: f32,
    pub max_outlier_fraction: f32,
    pub fraction_per_failure: f32,
    pub max_fraction_cap: f32,
    pub min_inliers: usize,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            min_samples: 8,
            noise_floor_d: 0.30,
            sigma_factor: 2.5,
            max_outlier_fraction: 0.20,
            fraction_per_failure: 0.02,
            max_fraction_cap: 0.35,
            min_inliers: 6,
        }
    }
}

/// Parameters of the quality-of-fit score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityParams {
    /// RMS residual (diopters) that maps to a score of 1.0.
    pub reference_rms_d: f32,
    /// Score added per recorded operator failure.
    pub failure_weight: f32,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            reference_rms_d: 0.25,
            failure_weight: 0.05,
        }
    }
}
