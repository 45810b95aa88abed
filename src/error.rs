use thiserror::Error;

/// Errors surfaced at the boundary of the engine.
///
/// Insufficient data never produces an error; the pipeline degrades to a
/// simpler estimate instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefractionError {
    /// A sample carried a non-finite angle or power.
    #[error("invalid sample: angle={angle}, power={power}")]
    InvalidSample { angle: f32, power: f32 },
    /// A parameter set failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

pub type Result<T> = std::result::Result<T, RefractionError>;

/// Rejects NaN or infinite sample values before they reach shared state.
pub fn check_sample(angle: f32, power: f32) -> Result<()> {
    if angle.is_finite() && power.is_finite() {
        Ok(())
    } else {
        Err(RefractionError::InvalidSample { angle, power })
    }
}
