#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod acceptance;
pub mod computed;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod prescription;
pub mod types;

// Engine internals: public for tools and tests, may change between releases.
pub mod angle;
pub mod fit;
pub mod rounding;
pub mod store;

// --- High-level re-exports -------------------------------------------------

pub use crate::computed::{ComputedPrescription, PrescriptionRecord};
pub use crate::config::EngineParams;
pub use crate::controller::{
    AcquisitionController, AcquisitionState, ControllerEvent, DeviceCapabilities, SampleOutcome,
};
pub use crate::error::{RefractionError, Result};
pub use crate::prescription::AstigmaticPrescription;
pub use crate::types::{MeasuredMeridian, PatientProfile, Usage};

pub use crate::diagnostics::{PipelineTrace, RefractionReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use refraction_engine::prelude::*;
///
/// # fn main() -> Result<()> {
/// let mut controller =
///     AcquisitionController::new(DeviceCapabilities::default(), EngineParams::default())?;
/// for angle in [0.0f32, 30.0, 60.0, 90.0, 120.0, 150.0] {
///     controller.add_result(angle, -1.25)?;
/// }
/// println!("rounded: {:?}", controller.update_fit_and_round());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        AcquisitionController, AstigmaticPrescription, DeviceCapabilities, EngineParams,
        PatientProfile, Result, Usage,
    };
}

// --- Stage-level API (for tools & advanced users) ---------------------------

pub mod stages {
    pub use crate::acceptance::accept;
    pub use crate::controller::{run_pipeline, run_with_report};
    pub use crate::fit::{assess_fit, fit_prescription, remove_outliers};
    pub use crate::rounding::{round_prescription, round_to_steps, soften_cylinder};

    pub use crate::diagnostics::{
        AcceptanceStage, FitStage, OutlierStage, PipelineStage, RoundingStage, SofteningStage,
        StageTiming, TimingBreakdown,
    };
}
