use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::fitted::{ForecastModel, SUPPORTED_FORMAT_VERSION};
use crate::error::{ForecastError, LoadFailure, Result};

/// Somewhere a fitted model can be loaded from
#[cfg_attr(test, mockall::automock)]
pub trait ModelSource: Send + Sync {
    fn load(&self) -> Result<ForecastModel>;

    /// Human-readable location, used in logs and status output
    fn describe(&self) -> String;
}

/// Model stored as a JSON document on disk
#[derive(Debug, Clone)]
pub struct FileModelSource {
    path: PathBuf,
}

impl FileModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelSource for FileModelSource {
    fn load(&self) -> Result<ForecastModel> {
        load_model(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read and validate a model file
pub fn load_model(path: &Path) -> Result<ForecastModel> {
    let contents = fs::read_to_string(path).map_err(|e| {
        let failure = match e.kind() {
            ErrorKind::NotFound => LoadFailure::NotFound,
            _ => LoadFailure::Io(e.to_string()),
        };
        warn!("Failed to read model file {}: {}", path.display(), failure);
        ForecastError::load(path, failure)
    })?;

    let model = parse_model(&contents).map_err(|failure| ForecastError::load(path, failure))?;

    info!(
        "Loaded model '{}' from {} ({} observations)",
        model.name(),
        path.display(),
        model.history().len()
    );
    Ok(model)
}

/// Parse a model document. The format version is checked before the schema so
/// files from newer writers report a version mismatch rather than a parse error.
pub fn parse_model(json: &str) -> std::result::Result<ForecastModel, LoadFailure> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| LoadFailure::Corrupt(e.to_string()))?;

    let version = value["metadata"]["format_version"]
        .as_u64()
        .ok_or_else(|| LoadFailure::Corrupt("missing metadata.format_version".to_string()))?;
    if version != u64::from(SUPPORTED_FORMAT_VERSION) {
        return Err(LoadFailure::UnsupportedVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: SUPPORTED_FORMAT_VERSION,
        });
    }

    let model: ForecastModel =
        serde_json::from_value(value).map_err(|e| LoadFailure::Corrupt(e.to_string()))?;
    model.validate()?;
    Ok(model)
}
