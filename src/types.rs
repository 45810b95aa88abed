use crate::angle::normalize_meridian;
use crate::prescription::AstigmaticPrescription;
use serde::{Deserialize, Serialize};

/// One power reading at one meridian.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasuredMeridian {
    pub angle: f32, // degrees, [0, 360)
    pub power: f32, // diopters
    #[serde(default)]
    pub is_outlier: bool,
}

impl MeasuredMeridian {
    pub fn new(angle: f32, power: f32) -> Self {
        Self {
            angle: normalize_meridian(angle),
            power,
            is_outlier: false,
        }
    }

    /// Signed difference between the prescription's prediction and this reading.
    pub fn residual(&self, rx: &AstigmaticPrescription) -> f32 {
        rx.power_at(self.angle) - self.power
    }
}

/// What the patient mostly needs the glasses for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    Near,
    Far,
    Both,
}

/// Patient context consumed by the acceptance engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Correction the patient currently owns, if known.
    pub current: Option<AstigmaticPrescription>,
    /// Whether the current correction is actually worn.
    pub using_glasses: bool,
    pub usage: Usage,
    pub age: u32,
}
