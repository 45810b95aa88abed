//! Patient acceptance adjustment.
//!
//! Takes the rounded prescription and moderates it against what the patient
//! currently wears, their age and how they use their glasses:
//! - [`sphere`] limits large sphere changes and applies myopia control,
//! - [`cylinder`] limits cylinder increases,
//! - [`presbyopia`] adds reading power by age.
//!
//! Inputs are never mutated; the accepted prescription is a new value.

pub mod cylinder;
pub mod params;
pub mod presbyopia;
pub mod sphere;

pub use cylinder::{accept_cylinder, CylinderDecision};
pub use params::AcceptanceParams;
pub use presbyopia::{AddStep, AddTable};
pub use sphere::{accept_sphere, SphereDecision, SphereInput};

use crate::prescription::AstigmaticPrescription;
use crate::types::{PatientProfile, Usage};
use log::debug;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceDiagnostics {
    pub reference: Option<AstigmaticPrescription>,
    pub sphere: SphereDecision,
    pub cylinder: CylinderDecision,
    pub add: Option<f32>,
    pub before: AstigmaticPrescription,
    pub after: AstigmaticPrescription,
}

/// Correction the new prescription is compared against: the current one when
/// worn, plano when owned but not worn, unknown otherwise.
pub fn reference_correction(profile: &PatientProfile) -> Option<AstigmaticPrescription> {
    let current = profile.current?;
    Some(if profile.using_glasses {
        current
    } else {
        AstigmaticPrescription::plano()
    })
}

/// Adjusts `new` for the patient described by `profile`.
pub fn accept(
    new: &AstigmaticPrescription,
    profile: &PatientProfile,
    failures: u32,
    params: &AcceptanceParams,
) -> (AstigmaticPrescription, AcceptanceDiagnostics) {
    let reference = reference_correction(profile);
    let (sphere, sphere_rule) = accept_sphere(
        &SphereInput {
            new: new.sphere(),
            reference: reference.map(|r| r.sphere()),
            age: profile.age,
            usage: profile.usage,
            failures,
        },
        params,
    );
    let (cylinder, cylinder_rule) =
        accept_cylinder(new.cylinder(), reference.map(|r| r.cylinder()), params);

    let add = if profile.usage != Usage::Far {
        params.presbyopia.add_for_age(profile.age)
    } else {
        None
    };

    let mut after = AstigmaticPrescription::normalized(
        sphere,
        cylinder,
        new.axis(),
        add.unwrap_or(new.add()),
    );
    if cylinder == 0.0 {
        after = after.without_cylinder();
    }
    debug!(
        "acceptance: {} -> {} (sphere {:?}, cylinder {:?}, add {:?})",
        new, after, sphere_rule, cylinder_rule, add
    );

    let diag = AcceptanceDiagnostics {
        reference,
        sphere: sphere_rule,
        cylinder: cylinder_rule,
        add,
        before: *new,
        after,
    };
    (after, diag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(current: Option<AstigmaticPrescription>, usage: Usage, age: u32) -> PatientProfile {
        PatientProfile {
            current,
            using_glasses: true,
            usage,
            age,
        }
    }

    #[test]
    fn productive_age_blend() {
        let new = AstigmaticPrescription::spherical(-3.0);
        let p = profile(Some(AstigmaticPrescription::spherical(-1.0)), Usage::Far, 25);
        let (out, diag) = accept(&new, &p, 0, &AcceptanceParams::default());
        assert_eq!(out.sphere(), -2.75);
        assert_eq!(out.add(), 0.0);
        assert_eq!(diag.sphere, SphereDecision::Blended { weight: 0.10 });
    }

    #[test]
    fn presbyopic_near_user_gets_add() {
        let new = AstigmaticPrescription::new(-1.0, -0.5, 80.0);
        let p = profile(None, Usage::Near, 45);
        let (out, diag) = accept(&new, &p, 0, &AcceptanceParams::default());
        assert_eq!(out.add(), 1.25);
        assert_eq!(out.sphere(), -1.0);
        assert_eq!(out.cylinder(), -0.5);
        assert_eq!(out.axis(), 80.0);
        assert_eq!(diag.add, Some(1.25));

        let p = profile(None, Usage::Far, 45);
        let (out, _) = accept(&new, &p, 0, &AcceptanceParams::default());
        assert_eq!(out.add(), 0.0);
    }

    #[test]
    fn unworn_glasses_compare_against_plano() {
        let new = AstigmaticPrescription::new(-0.25, -0.75, 10.0);
        let mut p = profile(Some(AstigmaticPrescription::new(-0.25, -0.75, 10.0)), Usage::Far, 30);
        p.using_glasses = false;
        let (out, diag) = accept(&new, &p, 0, &AcceptanceParams::default());
        assert_eq!(diag.reference, Some(AstigmaticPrescription::plano()));
        assert_eq!(out.cylinder(), -0.5);
        assert_eq!(out.axis(), 10.0);
    }

    #[test]
    fn inputs_are_untouched_and_bounded() {
        let params = AcceptanceParams::default();
        let current = AstigmaticPrescription::new(-1.0, -0.5, 90.0);
        for new_sphere in [-6.0f32, -3.0, -1.5, -1.0, 0.0, 1.5] {
            for new_cyl in [0.0f32, -0.5, -1.0, -3.0] {
                let new = AstigmaticPrescription::new(new_sphere, new_cyl, 90.0);
                let copy = new;
                let (out, _) = accept(&new, &profile(Some(current), Usage::Far, 30), 0, &params);
                assert_eq!(new, copy);
                // Accepted values lie between reference and new.
                let lo = new.sphere().min(current.sphere());
                let hi = new.sphere().max(current.sphere());
                assert!(out.sphere() >= lo - 1e-4 && out.sphere() <= hi + 1e-4);
                assert!(out.cylinder().abs() <= new.cylinder().abs().max(0.5) + 1e-4);
            }
        }
    }
}
