//! Snapping a continuous fit onto available lens steps.
//!
//! Astigmatic fits try the eight floor/ceil combinations of sphere, cylinder
//! and axis around the fit and keep the one with the smallest squared
//! residual against the readings. Near-spherical fits are rounded as a pure
//! sphere from the mean power instead.

use super::params::RoundingParams;
use crate::fit::meridian::mean_power;
use crate::prescription::AstigmaticPrescription;
use crate::types::MeasuredMeridian;
use serde::Serialize;

/// Tolerance (in steps) under which a value counts as already on the grid.
const GRID_EPS: f32 = 1e-4;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub prescription: AstigmaticPrescription,
    pub residual: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRounding {
    pub prescription: AstigmaticPrescription,
    pub sphere_only: bool,
    pub candidates: Vec<CandidateScore>,
}

/// Nearest multiple of `step`.
#[inline]
pub fn snap(value: f32, step: f32) -> f32 {
    (value / step).round() * step
}

/// Largest multiple of `step` not above `value` (within grid tolerance).
#[inline]
pub fn floor_step(value: f32, step: f32) -> f32 {
    ((value / step) + GRID_EPS).floor() * step
}

/// Smallest multiple of `step` not below `value` (within grid tolerance).
#[inline]
pub fn ceil_step(value: f32, step: f32) -> f32 {
    ((value / step) - GRID_EPS).ceil() * step
}

/// Multiple of `step` closest to zero among the two neighbours of `value`.
#[inline]
pub fn toward_zero_step(value: f32, step: f32) -> f32 {
    if value >= 0.0 {
        floor_step(value, step)
    } else {
        ceil_step(value, step)
    }
}

fn sum_squared_residual(rx: &AstigmaticPrescription, samples: &[MeasuredMeridian]) -> f32 {
    samples
        .iter()
        .filter(|m| !m.is_outlier)
        .map(|m| {
            let r = m.residual(rx) as f64;
            r * r
        })
        .sum::<f64>() as f32
}

/// Rounds `fit` onto the lens grid described by `params`.
pub fn round_to_steps(
    fit: &AstigmaticPrescription,
    samples: &[MeasuredMeridian],
    params: &RoundingParams,
) -> StepRounding {
    if fit.cylinder().abs() < params.cylinder_ignore_below {
        return round_sphere_only(fit, samples, params);
    }

    let step = params.step;
    let spheres = [ceil_step(fit.sphere(), step), floor_step(fit.sphere(), step)];
    let cylinders = [
        ceil_step(fit.cylinder(), step),
        floor_step(fit.cylinder(), step),
    ];
    let axes = [
        ceil_step(fit.axis(), params.axis_step_deg),
        floor_step(fit.axis(), params.axis_step_deg),
    ];

    let mut candidates = Vec::with_capacity(8);
    let mut best: Option<(usize, f32)> = None;
    for &sphere in &spheres {
        for &cylinder in &cylinders {
            for &axis in &axes {
                let rx = AstigmaticPrescription::new(sphere, cylinder, axis);
                let residual = sum_squared_residual(&rx, samples);
                match best {
                    Some((_, r)) if r <= residual => {}
                    _ => best = Some((candidates.len(), residual)),
                }
                candidates.push(CandidateScore {
                    prescription: rx,
                    residual,
                });
            }
        }
    }
    let prescription = best
        .map(|(idx, _)| candidates[idx].prescription)
        .unwrap_or(*fit);
    StepRounding {
        prescription,
        sphere_only: false,
        candidates,
    }
}

/// Rounds the mean power as a pure sphere, comparing the nearest step with
/// its two neighbours. The middle candidate gets a `sphere_tie_bias` head
/// start; between the outer two, the lower magnitude wins ties.
fn round_sphere_only(
    fit: &AstigmaticPrescription,
    samples: &[MeasuredMeridian],
    params: &RoundingParams,
) -> StepRounding {
    let step = params.step;
    let mean = mean_power(samples).unwrap_or_else(|| fit.spherical_equivalent());
    let current = snap(mean, step);
    let n = samples.iter().filter(|m| !m.is_outlier).count().max(1) as f32;
    let rms = |value: f32| {
        let rx = AstigmaticPrescription::spherical(value);
        (sum_squared_residual(&rx, samples) / n).sqrt()
    };

    let middle = AstigmaticPrescription::spherical(current);
    let middle_rms = rms(current);
    let mut candidates = vec![CandidateScore {
        prescription: middle,
        residual: middle_rms,
    }];
    let mut best = (middle, middle_rms - params.sphere_tie_bias);

    let mut outer = [current - step, current + step];
    outer.sort_by(|a, b| {
        a.abs()
            .partial_cmp(&b.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for value in outer {
        let score = rms(value);
        let rx = AstigmaticPrescription::spherical(value);
        candidates.push(CandidateScore {
            prescription: rx,
            residual: score,
        });
        if score < best.1 {
            best = (rx, score);
        }
    }

    StepRounding {
        prescription: best.0,
        sphere_only: true,
        candidates,
    }
}
