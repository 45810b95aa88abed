//! Thresholds used by step rounding and cylinder softening.
//!
//! Every clinical constant lives here so alternate threshold sets can be
//! supplied without touching the engine. Defaults reproduce the standard
//! 0.25 D / 5° lens grid.

use serde::{Deserialize, Serialize};

/// Step rounding, spherical-equivalent realignment and zeroing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingParams {
    /// Sphere and cylinder step (0.25, 0.125 or 0.0625 D).
    pub step: f32,
    /// Axis step in degrees.
    pub axis_step_deg: f32,
    /// Below this cylinder magnitude the fit is rounded as a pure sphere.
    pub cylinder_ignore_below: f32,
    /// Bias (D, RMS units) in favour of the middle sphere-only candidate.
    pub sphere_tie_bias: f32,
    /// Cylinder magnitudes below this are zeroed along with the axis.
    pub zero_cylinder_below: f32,
    /// Rounded SE more plus than the fit by this much gets a minus nudge.
    pub se_drift_plus_limit: f32,
    /// Rounded SE more minus than the fit by this much gets a plus nudge.
    pub se_drift_minus_limit: f32,
    /// Size of the SE realignment nudge.
    pub se_nudge: f32,
    pub softening: SofteningParams,
}

impl Default for RoundingParams {
    fn default() -> Self {
        Self {
            step: 0.25,
            axis_step_deg: 5.0,
            cylinder_ignore_below: 0.45,
            sphere_tie_bias: 0.05,
            zero_cylinder_below: 0.12,
            se_drift_plus_limit: 0.20,
            se_drift_minus_limit: 0.24,
            se_nudge: 0.25,
            softening: SofteningParams::default(),
        }
    }
}

impl RoundingParams {
    /// Quarter-diopter grid.
    pub fn quarter() -> Self {
        Self::default()
    }

    /// Eighth-diopter grid.
    pub fn eighth() -> Self {
        Self {
            step: 0.125,
            ..Self::default()
        }
    }

    /// Sixteenth-diopter grid.
    pub fn sixteenth() -> Self {
        Self {
            step: 0.0625,
            ..Self::default()
        }
    }
}

/// Quality-gated cylinder reduction.
///
/// - above `high_cut` (or mixed hyperopic astigmatism): force the cylinder
///   down by `forced_reduction`, halve it and move half the removed amount
///   into the sphere.
/// - above `mid_cut`: reduce by `mid_reduction` with `mid_sphere_shift` into
///   the sphere when more than `mid_keep_above` remains, else by
///   `step_reduction`.
/// - above `low_cut` with magnitude over `low_min_cylinder`: reduce by
///   `step_reduction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SofteningParams {
    /// Softening only considers cylinders with a larger magnitude.
    pub min_cylinder: f32,
    pub high_cut: f32,
    pub mid_cut: f32,
    pub low_cut: f32,
    pub low_min_cylinder: f32,
    pub forced_reduction: f32,
    pub mid_reduction: f32,
    pub mid_sphere_shift: f32,
    pub mid_keep_above: f32,
    pub step_reduction: f32,
}

impl Default for SofteningParams {
    fn default() -> Self {
        Self {
            min_cylinder: 0.249,
            high_cut: 1.25,
            mid_cut: 0.90,
            low_cut: 0.62,
            low_min_cylinder: 0.26,
            forced_reduction: 0.25,
            mid_reduction: 0.50,
            mid_sphere_shift: -0.25,
            mid_keep_above: 0.55,
            step_reduction: 0.25,
        }
    }
}

impl SofteningParams {
    /// True when the cuts are strictly increasing.
    pub fn cuts_ordered(&self) -> bool {
        self.low_cut < self.mid_cut && self.mid_cut < self.high_cut
    }
}
