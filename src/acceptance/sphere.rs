use super::params::AcceptanceParams;
use crate::rounding::step::snap;
use crate::types::Usage;
use serde::Serialize;

/// Which sphere rule produced the accepted value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum SphereDecision {
    /// No reference known; the new sphere stands.
    NoReference,
    WontNotice,
    Adaptation,
    Blended { weight: f32 },
    /// `offset` is the amount actually applied after capping at plano.
    MyopiaControl { offset: f32 },
    KeepNew,
}

/// Inputs of the sphere rule.
#[derive(Clone, Copy, Debug)]
pub struct SphereInput {
    pub new: f32,
    pub reference: Option<f32>,
    pub age: u32,
    pub usage: Usage,
    pub failures: u32,
}

pub fn accept_sphere(input: &SphereInput, params: &AcceptanceParams) -> (f32, SphereDecision) {
    let Some(reference) = input.reference else {
        return (input.new, SphereDecision::NoReference);
    };
    let delta = input.new - reference;
    if delta.abs() < params.wont_notice_d {
        return (input.new, SphereDecision::WontNotice);
    }

    if delta < 0.0 {
        let adaptation = if input.failures >= params.unreliable_after_failures {
            params.wont_notice_d
        } else {
            params.adaptation_d
        };
        if delta.abs() < adaptation {
            return (input.new, SphereDecision::Adaptation);
        }
        let weight = params.blend_weight(input.age);
        let blended = input.new + weight * (reference - input.new);
        (
            snap(blended, params.snap_step),
            SphereDecision::Blended { weight },
        )
    } else if input.new < 0.0 && input.age < params.myopia_control_age {
        let requested = match input.usage {
            Usage::Far => params.myopia_offset_far,
            Usage::Near | Usage::Both => params.myopia_offset_near,
        };
        // Undercorrects the myopia but never turns it into a plus lens.
        let accepted = (input.new + requested).min(0.0);
        let offset = accepted - input.new;
        (accepted, SphereDecision::MyopiaControl { offset })
    } else {
        (input.new, SphereDecision::KeepNew)
    }
}
