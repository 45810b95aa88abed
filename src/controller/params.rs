use super::grid::BucketGrid;
use crate::angle::{FULL_TURN_DEG, HALF_TURN_DEG};
use crate::error::{RefractionError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on grid buckets (0.1° spacing over a full turn).
pub const MAX_GRID_BUCKETS: usize = 3600;

/// What the measuring device can do. Replaces per-device subclasses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCapabilities {
    pub name: String,
    /// Lowest meridian the device can present (degrees).
    pub angle_min_deg: f32,
    /// Highest meridian the device can present (degrees).
    pub angle_max_deg: f32,
    /// Meridian step of the device; buckets are laid out at half this step.
    pub angle_step_deg: f32,
    /// 180 for optical meridians, 360 when the device reports raw rotation.
    pub wrap_period_deg: f32,
    /// Starting power for a bucket with no tested neighbour.
    pub default_start_power: f32,
    /// Overrides the default "half the buckets" completion count.
    pub required_meridians: Option<usize>,
    /// The device runs a rough alignment pass before the first bucket.
    pub rough_alignment_first: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            name: "generic".to_string(),
            angle_min_deg: 0.0,
            angle_max_deg: 180.0,
            angle_step_deg: 10.0,
            wrap_period_deg: HALF_TURN_DEG,
            default_start_power: 0.0,
            required_meridians: None,
            rough_alignment_first: false,
        }
    }
}

impl DeviceCapabilities {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.angle_min_deg,
            self.angle_max_deg,
            self.angle_step_deg,
            self.default_start_power,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(RefractionError::InvalidParams(format!(
                "device {}: non-finite value",
                self.name
            )));
        }
        if self.angle_step_deg <= 0.0 {
            return Err(RefractionError::InvalidParams(format!(
                "device {}: angle step must be positive",
                self.name
            )));
        }
        if self.angle_max_deg <= self.angle_min_deg {
            return Err(RefractionError::InvalidParams(format!(
                "device {}: empty angle range",
                self.name
            )));
        }
        if self.wrap_period_deg != HALF_TURN_DEG && self.wrap_period_deg != FULL_TURN_DEG {
            return Err(RefractionError::InvalidParams(format!(
                "device {}: wrap period must be 180 or 360, got {}",
                self.name, self.wrap_period_deg
            )));
        }
        let spacing = 0.5 * self.angle_step_deg;
        let span = self.angle_max_deg - self.angle_min_deg;
        let slots = (span / spacing).floor() + 1.0;
        if slots > MAX_GRID_BUCKETS as f32 {
            return Err(RefractionError::InvalidParams(format!(
                "device {}: step {}° over {}° needs {} buckets (max {})",
                self.name, self.angle_step_deg, span, slots, MAX_GRID_BUCKETS
            )));
        }
        if let Some(required) = self.required_meridians {
            let available = BucketGrid::for_device(self).len();
            if required == 0 || required > available {
                return Err(RefractionError::InvalidParams(format!(
                    "device {}: required meridians must be in 1..={available}, got {required}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Hysteresis and inheritance rules of the acquisition controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionParams {
    /// Minimum distance between the active and the new bucket.
    pub transition_min_deg: f32,
    /// Minimum raw movement since the active bucket was entered.
    pub movement_min_deg: f32,
    /// Tested buckets closer than this pass their power to a new bucket.
    pub inherit_within_deg: f32,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            transition_min_deg: 5.0,
            movement_min_deg: 5.0,
            inherit_within_deg: 50.0,
        }
    }
}
