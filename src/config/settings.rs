use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::WindowPolicy;
use crate::types::{Frequency, HorizonLimits};

pub const DEFAULT_MODEL_PATH: &str = "prophet_sales_predict.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub forecast: ForecastSettings,
    pub chart: ChartSettings,
    pub dashboard: DashboardSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.model.path.as_os_str().is_empty() {
            errors.push("model.path must not be empty".to_string());
        }

        if self.forecast.max_periods == 0 {
            errors.push("forecast.max_periods must be > 0".to_string());
        }
        if self.forecast.max_range_days == 0 {
            errors.push("forecast.max_range_days must be > 0".to_string());
        }

        if self.chart.width < 200 || self.chart.height < 150 {
            errors.push("chart: width must be >= 200 and height >= 150".to_string());
        }

        if self.dashboard.host.trim().is_empty() {
            errors.push("dashboard.host must not be empty".to_string());
        }
        if self.dashboard.port == 0 {
            errors.push("dashboard.port must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub default_frequency: Frequency,
    pub max_periods: u32,
    pub max_range_days: u32,
    pub window_policy: WindowPolicy,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        let limits = HorizonLimits::default();
        Self {
            default_frequency: Frequency::Monthly,
            max_periods: limits.max_periods,
            max_range_days: limits.max_range_days,
            window_policy: WindowPolicy::FutureOnly,
        }
    }
}

impl ForecastSettings {
    pub fn limits(&self) -> HorizonLimits {
        HorizonLimits {
            max_periods: self.max_periods,
            max_range_days: self.max_range_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    /// Y axis label; falls back to the model's label, then "Sales"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_label: Option<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            value_label: None,
        }
    }
}

impl ChartSettings {
    pub fn resolve_label(&self, model_label: Option<&str>) -> String {
        self.value_label
            .as_deref()
            .or(model_label)
            .unwrap_or("Sales")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub host: String,
    pub port: u16,
    pub cors_permissive: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            cors_permissive: true,
        }
    }
}
