//! Rounding and softening of a continuous fit.
//!
//! The engine runs four steps on the outlier-filtered fit:
//! 1. step rounding onto the lens grid ([`step`]),
//! 2. quality-gated cylinder softening ([`softening`]),
//! 3. spherical-equivalent realignment against the continuous fit, biased
//!    towards slight overcorrection,
//! 4. zeroing of clinically insignificant cylinder.
//!
//! The snapshot after step 2 is the "softened" prescription; the final one
//! is the "rounded" prescription. A missing fit propagates as `None`.

pub mod params;
pub mod softening;
pub mod step;

pub use params::{RoundingParams, SofteningParams};
pub use softening::{soften_cylinder, SofteningAction, SofteningDiagnostics};
pub use step::{round_to_steps, CandidateScore, StepRounding};

use crate::prescription::AstigmaticPrescription;
use crate::types::MeasuredMeridian;
use log::debug;
use serde::Serialize;

/// Rounding diagnostics for one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundingDiagnostics {
    pub fitted: AstigmaticPrescription,
    pub stepped: StepRounding,
    pub softening: SofteningDiagnostics,
    pub se_drift: f32,
    pub se_nudge: f32,
    pub zeroed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoundingOutcome {
    pub softened: AstigmaticPrescription,
    pub rounded: AstigmaticPrescription,
    pub diagnostics: RoundingDiagnostics,
}

/// Rounds and softens `fit`. `quality_score` comes from
/// [`crate::fit::quality_of_fit`] for the same fit and samples.
pub fn round_prescription(
    fit: Option<&AstigmaticPrescription>,
    samples: &[MeasuredMeridian],
    quality_score: f32,
    params: &RoundingParams,
) -> Option<RoundingOutcome> {
    let fit = fit?;
    let stepped = round_to_steps(fit, samples, params);
    let (softened, softening) = soften_cylinder(
        &stepped.prescription,
        quality_score,
        params.step,
        &params.softening,
    );

    let (realigned, se_drift, se_nudge) = realign_equivalent(&softened, fit, params);
    let (rounded, zeroed) = zero_small_cylinder(realigned, params.zero_cylinder_below);

    debug!(
        "rounding: fit={} stepped={} softened={} rounded={} score={:.3}",
        fit, stepped.prescription, softened, rounded, quality_score
    );

    Some(RoundingOutcome {
        softened,
        rounded,
        diagnostics: RoundingDiagnostics {
            fitted: *fit,
            stepped,
            softening,
            se_drift,
            se_nudge,
            zeroed,
        },
    })
}

/// Nudges the sphere when the stepped spherical equivalent drifted too far
/// from the continuous fit. The plus-side limit is tighter than the
/// minus-side one.
fn realign_equivalent(
    rx: &AstigmaticPrescription,
    fit: &AstigmaticPrescription,
    params: &RoundingParams,
) -> (AstigmaticPrescription, f32, f32) {
    let drift = rx.spherical_equivalent() - fit.spherical_equivalent();
    let nudge = if drift > params.se_drift_plus_limit {
        -params.se_nudge
    } else if drift < -params.se_drift_minus_limit {
        params.se_nudge
    } else {
        0.0
    };
    if nudge == 0.0 {
        (*rx, drift, 0.0)
    } else {
        (rx.with_sphere(rx.sphere() + nudge), drift, nudge)
    }
}

fn zero_small_cylinder(rx: AstigmaticPrescription, below: f32) -> (AstigmaticPrescription, bool) {
    if rx.cylinder().abs() < below {
        (rx.without_cylinder(), true)
    } else {
        (rx, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(rx: &AstigmaticPrescription) -> Vec<MeasuredMeridian> {
        (0..12)
            .map(|i| {
                let a = i as f32 * 15.0;
                MeasuredMeridian::new(a, rx.power_at(a))
            })
            .collect()
    }

    #[test]
    fn missing_fit_gives_missing_result() {
        assert!(round_prescription(None, &[], 0.0, &RoundingParams::default()).is_none());
    }

    #[test]
    fn clean_fit_passes_through() {
        let fit = AstigmaticPrescription::new(-2.0, -1.0, 90.0);
        let out = round_prescription(Some(&fit), &ring(&fit), 0.0, &RoundingParams::default())
            .unwrap();
        assert_eq!(out.rounded, fit);
        assert_eq!(out.softened, fit);
        assert!(!out.diagnostics.zeroed);
        assert_eq!(out.diagnostics.se_nudge, 0.0);
    }

    #[test]
    fn low_cylinder_becomes_pure_sphere() {
        let fit = AstigmaticPrescription::new(-3.0, -0.30, 20.0);
        let out = round_prescription(Some(&fit), &ring(&fit), 0.0, &RoundingParams::default())
            .unwrap();
        assert_eq!(out.rounded.cylinder(), 0.0);
        assert_eq!(out.rounded.axis(), 0.0);
        assert_eq!(out.rounded.sphere(), -3.25);
    }

    #[test]
    fn heavy_softening_keeps_equivalent_close() {
        // High cut: -3.00 cyl -> -1.25, 1.00 moved into the sphere.
        let fit = AstigmaticPrescription::new(-1.0, -3.0, 0.0);
        let params = RoundingParams::default();
        let out = round_prescription(Some(&fit), &ring(&fit), 2.0, &params).unwrap();
        let drift = out.rounded.spherical_equivalent() - fit.spherical_equivalent();
        assert!(drift <= params.se_drift_plus_limit + 1e-4, "drift={drift}");
        assert!(drift >= -params.se_drift_minus_limit - 0.25, "drift={drift}");
    }

    #[test]
    fn realign_prefers_overcorrection() {
        let fit = AstigmaticPrescription::spherical(-1.0);
        let params = RoundingParams::default();
        let (out, _, nudge) =
            realign_equivalent(&AstigmaticPrescription::spherical(-0.78), &fit, &params);
        assert_eq!(nudge, -0.25);
        assert!((out.sphere() + 1.03).abs() < 1e-5);
        let (_, _, nudge) =
            realign_equivalent(&AstigmaticPrescription::spherical(-1.22), &fit, &params);
        assert_eq!(nudge, 0.0);
        let (_, _, nudge) =
            realign_equivalent(&AstigmaticPrescription::spherical(-1.25), &fit, &params);
        assert_eq!(nudge, 0.25);
    }

    #[test]
    fn rounded_values_sit_on_the_grid() {
        for step_params in [
            RoundingParams::quarter(),
            RoundingParams::eighth(),
            RoundingParams::sixteenth(),
        ] {
            let fit = AstigmaticPrescription::new(-1.37, -1.83, 47.0);
            for score in [0.0f32, 0.7, 1.0, 1.6] {
                let out =
                    round_prescription(Some(&fit), &ring(&fit), score, &step_params).unwrap();
                let rx = out.rounded;
                let s = step_params.step;
                assert!(((rx.sphere() / s) - (rx.sphere() / s).round()).abs() < 1e-3, "{rx}");
                if rx.cylinder() == 0.0 {
                    assert_eq!(rx.axis(), 0.0);
                } else {
                    assert!(
                        ((rx.cylinder() / s) - (rx.cylinder() / s).round()).abs() < 1e-3,
                        "{rx}"
                    );
                }
            }
        }
    }
}
