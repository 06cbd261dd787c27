use crate::capture::CaptureError;
use thiserror::Error;

/// A specialized `Result` type for detection operations.
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Why a detection produced nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("Screen capture unavailable: {reason}")]
    CaptureUnavailable { reason: String },

    #[error("Template '{name}' is not loaded")]
    TemplateMissing { name: String },

    #[error("Template '{name}' best score {score:.3} is below threshold {threshold:.2}")]
    BelowThreshold {
        name: String,
        score: f32,
        threshold: f32,
    },
}

impl DetectionError {
    /// True for the normal "looked, nothing there" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DetectionError::BelowThreshold { .. })
    }

    /// Best score seen before the error, if any.
    pub fn score(&self) -> f32 {
        match self {
            DetectionError::BelowThreshold { score, .. } => *score,
            _ => 0.0,
        }
    }
}

impl From<CaptureError> for DetectionError {
    fn from(e: CaptureError) -> Self {
        DetectionError::CaptureUnavailable {
            reason: e.to_string(),
        }
    }
}
