//! Quality-gated cylinder softening.
//!
//! A noisy fit (or a sloppy acquisition) makes the measured cylinder less
//! trustworthy. The quality score picks how much of it to give back, and
//! the sphere absorbs part of the removed cylinder so the spherical
//! equivalent stays close to the fit.

use super::params::SofteningParams;
use super::step::{snap, toward_zero_step};
use crate::prescription::AstigmaticPrescription;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SofteningAction {
    NotApplied,
    /// Cylinder forced down, halved, half the removed amount moved to sphere.
    Halved { mixed_astigmatism: bool },
    /// Cylinder magnitude reduced by `amount` with `sphere_shift` applied.
    Reduced { amount: f32, sphere_shift: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SofteningDiagnostics {
    pub score: f32,
    pub action: SofteningAction,
    pub before: AstigmaticPrescription,
    pub after: AstigmaticPrescription,
}

/// Mixed astigmatism on a hyperope: one principal meridian plus, the other minus.
pub fn straddles_zero(rx: &AstigmaticPrescription) -> bool {
    rx.sphere() > 0.0 && rx.cross_power() < 0.0
}

/// Applies the softening rule selected by `score` to a stepped prescription.
pub fn soften_cylinder(
    rx: &AstigmaticPrescription,
    score: f32,
    step: f32,
    params: &SofteningParams,
) -> (AstigmaticPrescription, SofteningDiagnostics) {
    let magnitude = rx.cylinder().abs();
    let mixed = straddles_zero(rx);

    let (sphere_shift, new_magnitude, action) = if magnitude <= params.min_cylinder {
        (0.0, magnitude, SofteningAction::NotApplied)
    } else if score > params.high_cut || mixed {
        let forced = (magnitude - params.forced_reduction).max(0.0);
        let halved = toward_zero_step(0.5 * forced, step);
        let removed = magnitude - halved;
        (
            -snap(0.5 * removed, step),
            halved,
            SofteningAction::Halved {
                mixed_astigmatism: mixed,
            },
        )
    } else if score > params.mid_cut {
        if magnitude - params.mid_reduction > params.mid_keep_above {
            (
                params.mid_sphere_shift,
                magnitude - params.mid_reduction,
                SofteningAction::Reduced {
                    amount: params.mid_reduction,
                    sphere_shift: params.mid_sphere_shift,
                },
            )
        } else {
            reduce_by(magnitude, params.step_reduction)
        }
    } else if score > params.low_cut && magnitude > params.low_min_cylinder {
        reduce_by(magnitude, params.step_reduction)
    } else {
        (0.0, magnitude, SofteningAction::NotApplied)
    };

    let after = if action == SofteningAction::NotApplied {
        *rx
    } else {
        AstigmaticPrescription::normalized(
            rx.sphere() + sphere_shift,
            -new_magnitude.max(0.0),
            rx.axis(),
            rx.add(),
        )
    };
    let diag = SofteningDiagnostics {
        score,
        action,
        before: *rx,
        after,
    };
    (after, diag)
}

fn reduce_by(magnitude: f32, amount: f32) -> (f32, f32, SofteningAction) {
    let reduced = (magnitude - amount).max(0.0);
    (
        0.0,
        reduced,
        SofteningAction::Reduced {
            amount: magnitude - reduced,
            sphere_shift: 0.0,
        },
    )
}
