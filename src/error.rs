use std::path::PathBuf;
use thiserror::Error;

/// Why a model file could not be turned into a usable model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadFailure {
    #[error("file not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("corrupt model file: {0}")]
    Corrupt(String),

    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid model: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Model could not be loaded; terminal for the run or session
    #[error("failed to load model from {}: {failure}", path.display())]
    Load { path: PathBuf, failure: LoadFailure },

    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    #[error("no model loaded: {0}")]
    ModelUnavailable(String),

    #[error("prediction error: {0}")]
    Prediction(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("export error: {0}")]
    Export(String),
}

impl ForecastError {
    pub fn load(path: impl Into<PathBuf>, failure: LoadFailure) -> Self {
        ForecastError::Load { path: path.into(), failure }
    }

    pub fn invalid_horizon(msg: impl Into<String>) -> Self {
        ForecastError::InvalidHorizon(msg.into())
    }

    #[cfg(test)]
    pub fn is_load(&self) -> bool {
        matches!(self, ForecastError::Load { .. })
    }

    #[cfg(test)]
    pub fn is_invalid_horizon(&self) -> bool {
        matches!(self, ForecastError::InvalidHorizon(_))
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_message_names_path() {
        let err = ForecastError::load("missing.json", LoadFailure::NotFound);
        assert!(err.is_load());
        assert_eq!(err.to_string(), "failed to load model from missing.json: file not found");
    }

    #[test]
    fn test_version_mismatch_message() {
        let failure = LoadFailure::UnsupportedVersion { found: 7, supported: 1 };
        assert_eq!(failure.to_string(), "unsupported format version 7 (supported: 1)");
    }
}
