//! Engine parameters and JSON configuration loaders.

pub mod replay;

use crate::acceptance::AcceptanceParams;
use crate::controller::AcquisitionParams;
use crate::error::{RefractionError, Result};
use crate::fit::{FitParams, OutlierParams, QualityParams};
use crate::rounding::RoundingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every threshold set used by the pipeline and the controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub fit: FitParams,
    pub outliers: OutlierParams,
    pub quality: QualityParams,
    pub rounding: RoundingParams,
    pub acceptance: AcceptanceParams,
    pub acquisition: AcquisitionParams,
}

fn invalid(msg: impl Into<String>) -> RefractionError {
    RefractionError::InvalidParams(msg.into())
}

impl EngineParams {
    /// Parameters with the given sphere/cylinder step.
    pub fn with_step(step: f32) -> Self {
        let mut params = Self::default();
        params.rounding.step = step;
        params
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.rounding;
        if !(r.step.is_finite() && r.step > 0.0) {
            return Err(invalid(format!("rounding step must be positive, got {}", r.step)));
        }
        if !(r.axis_step_deg.is_finite() && r.axis_step_deg > 0.0) {
            return Err(invalid(format!(
                "axis step must be positive, got {}",
                r.axis_step_deg
            )));
        }
        if !r.softening.cuts_ordered() {
            return Err(invalid("softening cuts must satisfy low < mid < high"));
        }
        if r.se_drift_plus_limit < 0.0 || r.se_drift_minus_limit < 0.0 {
            return Err(invalid("equivalent drift limits must be non-negative"));
        }

        let o = &self.outliers;
        for (name, v) in [
            ("max_outlier_fraction", o.max_outlier_fraction),
            ("max_fraction_cap", o.max_fraction_cap),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid(format!("{name} must be within [0, 1], got {v}")));
            }
        }
        if o.sigma_factor <= 0.0 {
            return Err(invalid("outlier sigma factor must be positive"));
        }

        if self.fit.min_distinct_meridians < 3 {
            return Err(invalid(
                "the sinusoidal model needs at least 3 distinct meridians",
            ));
        }
        if self.quality.reference_rms_d <= 0.0 {
            return Err(invalid("reference RMS must be positive"));
        }

        let a = &self.acceptance;
        if a.snap_step <= 0.0 {
            return Err(invalid("acceptance snap step must be positive"));
        }
        if a.productive_age_min > a.productive_age_max {
            return Err(invalid("productive age range is empty"));
        }
        for (name, w) in [
            ("productive_blend", a.productive_blend),
            ("default_blend", a.default_blend),
            ("cylinder_blend", a.cylinder_blend),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(format!("{name} must be within [0, 1], got {w}")));
            }
        }

        let q = &self.acquisition;
        if q.transition_min_deg < 0.0 || q.movement_min_deg < 0.0 || q.inherit_within_deg < 0.0 {
            return Err(invalid("acquisition distances must be non-negative"));
        }
        Ok(())
    }
}

/// Reads and validates engine parameters from a JSON file. Missing fields
/// take their defaults.
pub fn load_params(path: &Path) -> std::result::Result<EngineParams, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let params: EngineParams = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    params
        .validate()
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(params)
}
