use super::params::AcceptanceParams;
use crate::rounding::step::snap;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum CylinderDecision {
    NoReference,
    /// New cylinder is no stronger than the reference.
    NotStronger,
    StepReduced { amount: f32 },
    Blended { weight: f32 },
}

/// Limits a cylinder increase over `reference`. Both values are signed
/// (negative-cylinder form); the comparison is on magnitudes.
pub fn accept_cylinder(
    new: f32,
    reference: Option<f32>,
    params: &AcceptanceParams,
) -> (f32, CylinderDecision) {
    let Some(reference) = reference else {
        return (new, CylinderDecision::NoReference);
    };
    let new_mag = new.abs();
    let ref_mag = reference.abs();
    if new_mag <= ref_mag {
        return (new, CylinderDecision::NotStronger);
    }
    let excess = new_mag - ref_mag;
    if excess <= params.cylinder_step_limit_d {
        let reduced = (new_mag - params.cylinder_step_reduction).max(ref_mag);
        (
            -reduced,
            CylinderDecision::StepReduced {
                amount: new_mag - reduced,
            },
        )
    } else {
        let weight = params.cylinder_blend;
        let blended = snap(new_mag + weight * (ref_mag - new_mag), params.snap_step);
        (-blended, CylinderDecision::Blended { weight })
    }
}
