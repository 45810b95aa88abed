use super::timing::TimingBreakdown;
use crate::acceptance::AcceptanceDiagnostics;
use crate::computed::PrescriptionRecord;
use crate::fit::{FitMethod, FitQuality, OutlierDiagnostics};
use crate::prescription::AstigmaticPrescription;
use crate::rounding::{SofteningAction, StepRounding};
use serde::Serialize;

/// Aggregate state paired with the trace of the run that produced it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefractionReport {
    pub record: PrescriptionRecord,
    pub trace: PipelineTrace,
}

fn format_optional(val: Option<AstigmaticPrescription>) -> String {
    val.map(|rx| rx.to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl RefractionReport {
    /// Multi-line human readable summary, as printed by the binaries.
    pub fn summary(&self) -> String {
        let record = &self.record;
        let mut lines = vec![
            format!(
                "readings={} buckets={} failures={}",
                record.store.len(),
                record.store.bucket_count(),
                record.failures
            ),
            format!("fitted:   {}", format_optional(record.fitted)),
            format!("softened: {}", format_optional(record.softened)),
            format!("rounded:  {}", format_optional(record.rounded)),
            format!("accepted: {}", format_optional(record.accepted)),
        ];
        if let Some(quality) = self.trace.rounding.as_ref().and_then(|r| r.quality.as_ref()) {
            lines.push(format!(
                "quality score={:.3} rms={:.3}",
                quality.score, quality.rms_residual
            ));
        }
        if let Some(outliers) = &self.trace.outliers {
            lines.push(format!(
                "outliers {}/{} (budget {})",
                outliers.diagnostics.flagged.len(),
                outliers.diagnostics.total,
                outliers.diagnostics.max_outliers
            ));
        }
        lines.push(format!("total {:.3} ms", self.trace.timings.total_ms));
        lines.join("\n")
    }
}

/// Stage-by-stage trace of one pipeline run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub timings: TimingBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<OutlierStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounding: Option<RoundingStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub softening: Option<SofteningStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<AcceptanceStage>,
}

/// Initial fit over every reading, before outlier rejection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitStage {
    pub elapsed_ms: f64,
    pub method: FitMethod,
    pub samples_used: usize,
    pub distinct_meridians: usize,
    pub prescription: AstigmaticPrescription,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierStage {
    pub elapsed_ms: f64,
    pub failures: u32,
    pub diagnostics: OutlierDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refit: Option<AstigmaticPrescription>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundingStage {
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<FitQuality>,
    pub step: f32,
    pub stepped: StepRounding,
    pub se_drift: f32,
    pub se_nudge: f32,
    pub zeroed: bool,
    pub rounded: AstigmaticPrescription,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SofteningStage {
    pub score: f32,
    pub action: SofteningAction,
    pub before: AstigmaticPrescription,
    pub after: AstigmaticPrescription,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceStage {
    pub elapsed_ms: f64,
    pub failures: u32,
    pub age: u32,
    pub diagnostics: AcceptanceDiagnostics,
}
