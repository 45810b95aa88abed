//! Least-squares fit of the sphero-cylindrical meridian model.
//!
//! Power in meridian θ of a lens `S / C × α` is `S + C·sin²(θ − α)`, which
//! expands to `a + b·cos 2θ + c·sin 2θ` with
//! `a = S + C/2`, `b = −(C/2)·cos 2α`, `c = −(C/2)·sin 2α`. The linear
//! coefficients are solved with an SVD; taking `C ≤ 0` gives
//! `C = −2·√(b² + c²)`, `α = ½·atan2(c, b)` and `S = a − C/2`.

use super::FitParams;
use crate::angle::{circular_distance, normalize_axis, HALF_TURN_DEG};
use crate::prescription::AstigmaticPrescription;
use crate::types::MeasuredMeridian;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// How a fit was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    LeastSquares,
    /// Too few meridians or a degenerate system: mean power as a sphere.
    SphericalMean,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeridianFit {
    pub prescription: AstigmaticPrescription,
    pub method: FitMethod,
    pub samples_used: usize,
    pub distinct_meridians: usize,
}

/// Fits a prescription to the non-outlier readings in `samples`.
///
/// Returns `None` when no usable reading is present.
pub fn fit_prescription(samples: &[MeasuredMeridian], params: &FitParams) -> Option<MeridianFit> {
    let inliers: Vec<&MeasuredMeridian> = samples.iter().filter(|m| !m.is_outlier).collect();
    if inliers.is_empty() {
        return None;
    }
    let distinct = count_distinct_meridians(&inliers, params.meridian_separation_deg);
    if distinct < params.min_distinct_meridians {
        debug!(
            "fit: {} distinct meridian(s) < {}, using spherical mean",
            distinct, params.min_distinct_meridians
        );
        return Some(spherical_mean_fit(&inliers, distinct));
    }

    match solve_sinusoid(&inliers, params.svd_eps) {
        Some(prescription) => Some(MeridianFit {
            prescription,
            method: FitMethod::LeastSquares,
            samples_used: inliers.len(),
            distinct_meridians: distinct,
        }),
        None => {
            warn!("fit: least-squares system is singular, falling back to spherical mean");
            Some(spherical_mean_fit(&inliers, distinct))
        }
    }
}

/// Mean power of the non-outlier readings, or `None` if there are none.
pub fn mean_power(samples: &[MeasuredMeridian]) -> Option<f32> {
    let (sum, n) = samples
        .iter()
        .filter(|m| !m.is_outlier)
        .fold((0.0f64, 0usize), |(s, n), m| (s + m.power as f64, n + 1));
    if n == 0 {
        None
    } else {
        Some((sum / n as f64) as f32)
    }
}

fn spherical_mean_fit(inliers: &[&MeasuredMeridian], distinct: usize) -> MeridianFit {
    let sum: f64 = inliers.iter().map(|m| m.power as f64).sum();
    let mean = (sum / inliers.len() as f64) as f32;
    MeridianFit {
        prescription: AstigmaticPrescription::spherical(mean),
        method: FitMethod::SphericalMean,
        samples_used: inliers.len(),
        distinct_meridians: distinct,
    }
}

fn solve_sinusoid(inliers: &[&MeasuredMeridian], eps: f64) -> Option<AstigmaticPrescription> {
    let n = inliers.len();
    let mut a = DMatrix::<f64>::zeros(n, 3);
    let mut rhs = DVector::<f64>::zeros(n);
    for (i, m) in inliers.iter().enumerate() {
        let two_theta = 2.0 * (m.angle as f64).to_radians();
        a[(i, 0)] = 1.0;
        a[(i, 1)] = two_theta.cos();
        a[(i, 2)] = two_theta.sin();
        rhs[i] = m.power as f64;
    }
    let svd = a.svd(true, true);
    if svd.singular_values.iter().any(|s| !s.is_finite() || *s <= eps) {
        return None;
    }
    let coeffs = svd.solve(&rhs, eps).ok()?;
    let (mean, b, c) = (coeffs[0], coeffs[1], coeffs[2]);
    if !(mean.is_finite() && b.is_finite() && c.is_finite()) {
        return None;
    }
    let r = (b * b + c * c).sqrt();
    let cylinder = -2.0 * r;
    let sphere = mean - 0.5 * cylinder;
    let axis = if r > 1e-9 {
        0.5 * c.atan2(b).to_degrees()
    } else {
        0.0
    };
    Some(AstigmaticPrescription::new(
        sphere as f32,
        cylinder as f32,
        normalize_axis(axis as f32),
    ))
}

/// Counts meridians (modulo 180°) separated by more than `separation_deg`.
pub(crate) fn count_distinct_meridians(inliers: &[&MeasuredMeridian], separation_deg: f32) -> usize {
    let mut seen: Vec<f32> = Vec::new();
    for m in inliers {
        let axis = normalize_axis(m.angle);
        if seen
            .iter()
            .all(|&s| circular_distance(s, axis, HALF_TURN_DEG) > separation_deg)
        {
            seen.push(axis);
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_from(rx: &AstigmaticPrescription, angles: &[f32]) -> Vec<MeasuredMeridian> {
        angles
            .iter()
            .map(|&a| MeasuredMeridian::new(a, rx.power_at(a)))
            .collect()
    }

    #[test]
    fn recovers_exact_astigmatic_prescription() {
        let truth = AstigmaticPrescription::new(-1.5, -1.25, 35.0);
        let angles: Vec<f32> = (0..12).map(|i| i as f32 * 15.0).collect();
        let fit = fit_prescription(&samples_from(&truth, &angles), &FitParams::default()).unwrap();
        assert_eq!(fit.method, FitMethod::LeastSquares);
        let rx = fit.prescription;
        assert!((rx.sphere() - truth.sphere()).abs() < 1e-3, "{rx}");
        assert!((rx.cylinder() - truth.cylinder()).abs() < 1e-3, "{rx}");
        assert!((rx.axis() - truth.axis()).abs() < 0.05, "{rx}");
    }

    #[test]
    fn handles_axis_near_wrap() {
        let truth = AstigmaticPrescription::new(0.5, -2.0, 178.0);
        let angles = [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 200.0, 300.0];
        let rx = fit_prescription(&samples_from(&truth, &angles), &FitParams::default())
            .unwrap()
            .prescription;
        assert!(circular_distance(rx.axis(), 178.0, 180.0) < 0.05, "{rx}");
        assert!((rx.cylinder() + 2.0).abs() < 1e-3);
    }

    #[test]
    fn two_meridians_degrade_to_spherical_mean() {
        let samples = vec![
            MeasuredMeridian::new(0.0, -1.0),
            MeasuredMeridian::new(90.0, -2.0),
            MeasuredMeridian::new(180.0, -1.0),
        ];
        let fit = fit_prescription(&samples, &FitParams::default()).unwrap();
        assert_eq!(fit.method, FitMethod::SphericalMean);
        assert_eq!(fit.distinct_meridians, 2);
        assert!((fit.prescription.sphere() + 4.0 / 3.0).abs() < 1e-5);
        assert_eq!(fit.prescription.cylinder(), 0.0);
    }

    #[test]
    fn outliers_are_excluded() {
        let truth = AstigmaticPrescription::spherical(-2.0);
        let mut samples = samples_from(&truth, &[0.0, 45.0, 90.0, 135.0]);
        samples.push(MeasuredMeridian {
            angle: 60.0,
            power: 5.0,
            is_outlier: true,
        });
        let rx = fit_prescription(&samples, &FitParams::default())
            .unwrap()
            .prescription;
        assert!((rx.sphere() + 2.0).abs() < 1e-4);
        assert!(rx.cylinder().abs() < 1e-4);
    }

    #[test]
    fn empty_input_has_no_fit() {
        assert!(fit_prescription(&[], &FitParams::default()).is_none());
        let all_out = [MeasuredMeridian {
            angle: 0.0,
            power: 1.0,
            is_outlier: true,
        }];
        assert!(fit_prescription(&all_out, &FitParams::default()).is_none());
        assert_eq!(mean_power(&all_out), None);
    }
}
