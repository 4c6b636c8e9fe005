use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForecastError, Result};

/// Sampling frequency of generated future periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,   // fixed 1-day steps
    Monthly, // calendar month-ends
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn unit_label(&self, count: u32) -> &'static str {
        match (self, count) {
            (Frequency::Daily, 1) => "Day",
            (Frequency::Daily, _) => "Days",
            (Frequency::Monthly, 1) => "Month",
            (Frequency::Monthly, _) => "Months",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounds applied to user-supplied horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonLimits {
    pub max_periods: u32,
    pub max_range_days: u32,
}

impl Default for HorizonLimits {
    fn default() -> Self {
        Self {
            max_periods: 60,
            max_range_days: 3660,
        }
    }
}

/// Requested forecast horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Horizon {
    /// `count` future periods after the end of the model history
    Periods { count: u32, frequency: Frequency },
    /// Inclusive explicit date range
    Range { start: NaiveDate, end: NaiveDate },
}

impl Horizon {
    /// Builds a period horizon from a raw user count. Zero and negative counts are rejected.
    pub fn from_count(raw: i64, frequency: Frequency, limits: &HorizonLimits) -> Result<Self> {
        if raw <= 0 {
            return Err(ForecastError::invalid_horizon(format!(
                "period count must be a positive integer, got {}",
                raw
            )));
        }
        let count = u32::try_from(raw).map_err(|_| {
            ForecastError::invalid_horizon(format!("period count {} is too large", raw))
        })?;

        let horizon = Horizon::Periods { count, frequency };
        horizon.validate(limits)?;
        Ok(horizon)
    }

    /// Parses a count typed at a prompt, e.g. `"12"`
    pub fn parse_count(input: &str, frequency: Frequency, limits: &HorizonLimits) -> Result<Self> {
        let trimmed = input.trim();
        let raw: i64 = trimmed.parse().map_err(|_| {
            ForecastError::invalid_horizon(format!("expected a whole number, got {:?}", trimmed))
        })?;
        Self::from_count(raw, frequency, limits)
    }

    pub fn from_range(start: NaiveDate, end: NaiveDate, limits: &HorizonLimits) -> Result<Self> {
        let horizon = Horizon::Range { start, end };
        horizon.validate(limits)?;
        Ok(horizon)
    }

    pub fn validate(&self, limits: &HorizonLimits) -> Result<()> {
        match *self {
            Horizon::Periods { count, .. } => {
                if count == 0 {
                    return Err(ForecastError::invalid_horizon(
                        "period count must be a positive integer, got 0",
                    ));
                }
                if count > limits.max_periods {
                    return Err(ForecastError::invalid_horizon(format!(
                        "period count {} exceeds the maximum of {}",
                        count, limits.max_periods
                    )));
                }
            }
            Horizon::Range { start, end } => {
                if end < start {
                    return Err(ForecastError::invalid_horizon(format!(
                        "end date {} is before start date {}",
                        end, start
                    )));
                }
                let span = (end - start).num_days();
                if span > i64::from(limits.max_range_days) {
                    return Err(ForecastError::invalid_horizon(format!(
                        "date range of {} days exceeds the maximum of {} days",
                        span, limits.max_range_days
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn title(&self) -> String {
        match *self {
            Horizon::Periods { count, frequency } => {
                format!("Forecast for Next {} {}", count, frequency.unit_label(count))
            }
            Horizon::Range { start, end } => format!("Forecast from {} to {}", start, end),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Periods { count, frequency } => write!(f, "{} {} periods", count, frequency),
            Horizon::Range { start, end } => write!(f, "{} to {}", start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_count_bounds() {
        let limits = HorizonLimits::default();
        assert!(Horizon::from_count(1, Frequency::Monthly, &limits).is_ok());
        assert!(Horizon::from_count(60, Frequency::Monthly, &limits).is_ok());

        for bad in [0, -1, -60, 61] {
            let err = Horizon::from_count(bad, Frequency::Monthly, &limits).unwrap_err();
            assert!(err.is_invalid_horizon(), "count {} should be rejected", bad);
        }
    }

    #[test]
    fn test_parse_count_input() {
        let limits = HorizonLimits::default();
        let horizon = Horizon::parse_count(" 12\n", Frequency::Monthly, &limits).unwrap();
        assert_eq!(horizon, Horizon::Periods { count: 12, frequency: Frequency::Monthly });

        assert!(Horizon::parse_count("twelve", Frequency::Monthly, &limits)
            .unwrap_err()
            .is_invalid_horizon());
        assert!(Horizon::parse_count("2.5", Frequency::Monthly, &limits).is_err());
    }

    #[test]
    fn test_range_validation() {
        let limits = HorizonLimits::default();
        assert!(Horizon::from_range(date(2024, 1, 1), date(2024, 1, 1), &limits).is_ok());
        assert!(Horizon::from_range(date(2024, 1, 2), date(2024, 1, 1), &limits)
            .unwrap_err()
            .is_invalid_horizon());

        let tight = HorizonLimits { max_periods: 60, max_range_days: 30 };
        assert!(Horizon::from_range(date(2024, 1, 1), date(2024, 3, 1), &tight).is_err());
    }

    #[test]
    fn test_titles() {
        let monthly = Horizon::Periods { count: 12, frequency: Frequency::Monthly };
        assert_eq!(monthly.title(), "Forecast for Next 12 Months");

        let single = Horizon::Periods { count: 1, frequency: Frequency::Daily };
        assert_eq!(single.title(), "Forecast for Next 1 Day");

        let range = Horizon::Range { start: date(2024, 1, 1), end: date(2024, 12, 31) };
        assert_eq!(range.title(), "Forecast from 2024-01-01 to 2024-12-31");
    }

    #[test]
    fn test_horizon_json_shape() {
        let json = r#"{"mode":"periods","count":6,"frequency":"daily"}"#;
        let horizon: Horizon = serde_json::from_str(json).unwrap();
        assert_eq!(horizon, Horizon::Periods { count: 6, frequency: Frequency::Daily });
    }
}
