use super::presbyopia::AddTable;
use serde::{Deserialize, Serialize};

/// Thresholds of the patient acceptance adjustment.
///
/// Sphere deltas are `new − reference`, where the reference is the current
/// correction when it is worn and plano otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceParams {
    /// Sphere changes below this magnitude go unnoticed.
    pub wont_notice_d: f32,
    /// More-minus changes below this magnitude are adapted to.
    pub adaptation_d: f32,
    /// Inclusive age range that adapts best.
    pub productive_age_min: u32,
    pub productive_age_max: u32,
    /// Blend weight towards the reference inside the productive age range.
    pub productive_blend: f32,
    /// Blend weight towards the reference otherwise.
    pub default_blend: f32,
    /// Myopia control applies below this age.
    pub myopia_control_age: u32,
    pub myopia_offset_near: f32,
    pub myopia_offset_far: f32,
    /// Cylinder increases up to this magnitude are reduced by one step.
    pub cylinder_step_limit_d: f32,
    pub cylinder_step_reduction: f32,
    pub cylinder_blend: f32,
    /// Grid the blended values are snapped to.
    pub snap_step: f32,
    /// Failure count from which the readings are treated as unreliable and
    /// large sphere changes are always blended.
    pub unreliable_after_failures: u32,
    pub presbyopia: AddTable,
}

impl Default for AcceptanceParams {
    fn default() -> Self {
        Self {
            wont_notice_d: 0.5,
            adaptation_d: 1.5,
            productive_age_min: 20,
            productive_age_max: 40,
            productive_blend: 0.10,
            default_blend: 0.33,
            myopia_control_age: 20,
            myopia_offset_near: 0.50,
            myopia_offset_far: 0.25,
            cylinder_step_limit_d: 1.0,
            cylinder_step_reduction: 0.25,
            cylinder_blend: 0.33,
            snap_step: 0.25,
            unreliable_after_failures: 4,
            presbyopia: AddTable::default(),
        }
    }
}

impl AcceptanceParams {
    pub(crate) fn blend_weight(&self, age: u32) -> f32 {
        if (self.productive_age_min..=self.productive_age_max).contains(&age) {
            self.productive_blend
        } else {
            self.default_blend
        }
    }
}
