use crate::prescription::AstigmaticPrescription;
use serde::Serialize;

/// Notifications pushed to every subscriber of an acquisition controller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ControllerEvent {
    /// A new bucket became active.
    BucketEntered {
        key: i32,
        angle: f32,
        start_power: f32,
    },
    /// A reading landed in the active bucket.
    SampleRecorded { key: i32, angle: f32, power: f32 },
    /// A reading pointed at another bucket without enough movement.
    AlignmentFailure { angle: f32, failures: u32 },
    /// The pipeline produced new snapshots.
    PrescriptionUpdated {
        rounded: Option<AstigmaticPrescription>,
        accepted: Option<AstigmaticPrescription>,
    },
    /// Enough meridians were tested; the eye is done.
    Completed {
        tested: usize,
        rounded: Option<AstigmaticPrescription>,
        accepted: Option<AstigmaticPrescription>,
    },
}
