//! Astigmatic prescription value type.
//!
//! A prescription is always held in negative-cylinder form. Every path that
//! produces or changes one (constructors, setters, deserialization) goes
//! through [`AstigmaticPrescription::normalized`], so callers never observe a
//! positive cylinder or an axis outside [0, 180).

use crate::angle::normalize_axis;
use serde::{Deserialize, Serialize};

/// Cylinder values above this are considered positive and transposed.
pub const POSITIVE_CYLINDER_TOL: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPrescription")]
pub struct AstigmaticPrescription {
    sphere: f32,
    cylinder: f32,
    axis: f32,
    add: f32,
}

/// Unchecked wire form; converted through the normalizing constructor.
#[derive(Deserialize)]
struct RawPrescription {
    sphere: f32,
    cylinder: f32,
    axis: f32,
    #[serde(default)]
    add: f32,
}

impl From<RawPrescription> for AstigmaticPrescription {
    fn from(raw: RawPrescription) -> Self {
        Self::normalized(raw.sphere, raw.cylinder, raw.axis, raw.add)
    }
}

impl Default for AstigmaticPrescription {
    fn default() -> Self {
        Self::plano()
    }
}

impl AstigmaticPrescription {
    /// Builds a prescription without add power.
    pub fn new(sphere: f32, cylinder: f32, axis: f32) -> Self {
        Self::normalized(sphere, cylinder, axis, 0.0)
    }

    /// Builds a pure sphere.
    pub fn spherical(sphere: f32) -> Self {
        Self::normalized(sphere, 0.0, 0.0, 0.0)
    }

    /// A zero-power lens.
    pub fn plano() -> Self {
        Self {
            sphere: 0.0,
            cylinder: 0.0,
            axis: 0.0,
            add: 0.0,
        }
    }

    /// Applies the negative-cylinder transform and axis folding.
    pub fn normalized(sphere: f32, cylinder: f32, axis: f32, add: f32) -> Self {
        let (mut sphere, mut cylinder, mut axis) = (sphere, cylinder, axis);
        if cylinder > POSITIVE_CYLINDER_TOL {
            sphere += cylinder;
            cylinder = -cylinder;
            axis += 90.0;
        }
        Self {
            sphere,
            cylinder,
            axis: normalize_axis(axis),
            add: add.max(0.0),
        }
    }

    pub fn sphere(&self) -> f32 {
        self.sphere
    }

    pub fn cylinder(&self) -> f32 {
        self.cylinder
    }

    pub fn axis(&self) -> f32 {
        self.axis
    }

    pub fn add(&self) -> f32 {
        self.add
    }

    pub fn set_sphere(&mut self, sphere: f32) {
        *self = Self::normalized(sphere, self.cylinder, self.axis, self.add);
    }

    pub fn set_cylinder(&mut self, cylinder: f32) {
        *self = Self::normalized(self.sphere, cylinder, self.axis, self.add);
    }

    pub fn set_axis(&mut self, axis: f32) {
        *self = Self::normalized(self.sphere, self.cylinder, axis, self.add);
    }

    pub fn set_add(&mut self, add: f32) {
        self.add = add.max(0.0);
    }

    /// Copy with a different sphere.
    pub fn with_sphere(mut self, sphere: f32) -> Self {
        self.set_sphere(sphere);
        self
    }

    /// Copy with a different add power.
    pub fn with_add(mut self, add: f32) -> Self {
        self.set_add(add);
        self
    }

    /// `sphere + cylinder / 2`.
    pub fn spherical_equivalent(&self) -> f32 {
        self.sphere + 0.5 * self.cylinder
    }

    /// Predicted power in the meridian at `angle` degrees:
    /// `sphere + cylinder * sin²(angle - axis)`.
    pub fn power_at(&self, angle: f32) -> f32 {
        let s = (angle - self.axis).to_radians().sin();
        self.sphere + self.cylinder * s * s
    }

    /// Power of the meridian 90° away from the axis.
    pub fn cross_power(&self) -> f32 {
        self.sphere + self.cylinder
    }

    /// Drops cylinder and axis entirely.
    pub fn without_cylinder(self) -> Self {
        Self {
            cylinder: 0.0,
            axis: 0.0,
            ..self
        }
    }
}

impl std::fmt::Display for AstigmaticPrescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:+.2} {:+.2} x {:.0}",
            self.sphere, self.cylinder, self.axis
        )?;
        if self.add > 0.0 {
            write!(f, " add {:+.2}", self.add)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn positive_cylinder_is_transposed() {
        let rx = AstigmaticPrescription::new(-2.0, 1.0, 30.0);
        assert!(approx_eq(rx.sphere(), -1.0));
        assert!(approx_eq(rx.cylinder(), -1.0));
        assert!(approx_eq(rx.axis(), 120.0));
    }

    #[test]
    fn transpose_is_idempotent() {
        let once = AstigmaticPrescription::new(0.5, 1.75, 170.0);
        let twice = AstigmaticPrescription::normalized(
            once.sphere(),
            once.cylinder(),
            once.axis(),
            once.add(),
        );
        assert_eq!(once, twice);
        assert!(once.cylinder() <= 0.0);
        assert!(approx_eq(once.axis(), 80.0));
    }

    #[test]
    fn tiny_positive_cylinder_is_left_alone() {
        let rx = AstigmaticPrescription::new(-1.0, 0.0005, 200.0);
        assert!(approx_eq(rx.sphere(), -1.0));
        assert!(approx_eq(rx.axis(), 20.0));
    }

    #[test]
    fn setters_keep_negative_cylinder_form() {
        let mut rx = AstigmaticPrescription::new(-1.0, -0.5, 10.0);
        rx.set_cylinder(0.75);
        assert!(approx_eq(rx.sphere(), -0.25));
        assert!(approx_eq(rx.cylinder(), -0.75));
        assert!(approx_eq(rx.axis(), 100.0));
        rx.set_axis(-10.0);
        assert!(approx_eq(rx.axis(), 170.0));
        rx.set_add(-1.0);
        assert_eq!(rx.add(), 0.0);
    }

    #[test]
    fn power_at_matches_principal_meridians() {
        let rx = AstigmaticPrescription::new(-2.0, -1.0, 90.0);
        assert!(approx_eq(rx.power_at(90.0), -2.0));
        assert!(approx_eq(rx.power_at(270.0), -2.0));
        assert!(approx_eq(rx.power_at(0.0), -3.0));
        assert!(approx_eq(rx.power_at(45.0), -2.5));
        assert!(approx_eq(rx.spherical_equivalent(), -2.5));
    }

    #[test]
    fn deserialization_normalizes() {
        let rx: AstigmaticPrescription =
            serde_json::from_str(r#"{"sphere":-2.0,"cylinder":1.0,"axis":30.0}"#).unwrap();
        assert!(approx_eq(rx.sphere(), -1.0));
        assert!(approx_eq(rx.cylinder(), -1.0));
        assert!(approx_eq(rx.axis(), 120.0));
        let json = serde_json::to_string(&rx).unwrap();
        let back: AstigmaticPrescription = serde_json::from_str(&json).unwrap();
        assert_eq!(rx, back);
    }
}
