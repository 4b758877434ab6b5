use thiserror::Error;

#[derive(Debug, Error)]
pub enum RigError {
    #[error("{what}: need at least {needed} points, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("smoothing window {window} invalid for {len} samples")]
    InvalidWindow { window: usize, len: usize },
    #[error("degenerate calibration model for {sensor}: {reason}")]
    DegenerateModel {
        sensor: &'static str,
        reason: &'static str,
    },
    #[error("no event found: {0}")]
    NoEventFound(String),
    #[error("acquisition failed on {channel}: expected {expected} samples, got {got}")]
    ShortRead {
        channel: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("acquisition failed: {0}")]
    Acquisition(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RigError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RigError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RigError {
    fn from(value: image::ImageError) -> Self {
        RigError::Plot(value.to_string())
    }
}
