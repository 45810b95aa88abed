//! Acquisition controller driving one eye's test to completion.
//!
//! Overview
//! - [`params`]: device capability value and hysteresis thresholds.
//! - [`grid`]: the fixed half-step bucket grid readings snap onto.
//! - [`acquisition`]: the `Idle → BucketActive → Finished` state machine.
//! - [`pipeline`]: fit, outlier rejection, rounding and acceptance over the
//!   shared aggregate.
//! - [`events`]: notifications delivered over `std::sync::mpsc` channels.

pub mod acquisition;
pub mod events;
pub mod grid;
pub mod params;
pub mod pipeline;

pub use acquisition::{AcquisitionController, AcquisitionState, SampleOutcome};
pub use events::ControllerEvent;
pub use grid::BucketGrid;
pub use params::{AcquisitionParams, DeviceCapabilities};
pub use pipeline::{report_without_run, run_pipeline, run_with_report};
