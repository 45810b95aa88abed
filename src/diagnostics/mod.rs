//! Diagnostics data model exposed by the pipeline and the binaries.
//!
//! [`RefractionReport`] is the main entry point: it bundles the aggregate
//! record of one eye with a [`PipelineTrace`] describing every stage the last
//! pipeline run executed. Everything serializes to camelCase JSON.

pub mod pipeline;
pub mod timing;

pub use pipeline::{
    AcceptanceStage, FitStage, OutlierStage, PipelineTrace, RefractionReport, RoundingStage,
    SofteningStage,
};
pub use timing::{elapsed_ms, PipelineStage, StageTiming, TimingBreakdown};
