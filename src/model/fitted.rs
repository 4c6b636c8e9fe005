use chrono::{DateTime, NaiveDate, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::calendar;
use super::seasonality::{SeasonalityMode, SeasonalityParams};
use super::trend::TrendParams;
use super::Forecaster;
use crate::error::{ForecastError, LoadFailure, Result};
use crate::types::{ForecastResult, ForecastRow, Frequency, FutureTimeline, Observation};

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub format_version: u32,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value_label: Option<String>,
}

/// Maps dates and values into the units the parameters were fitted in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub t_start: NaiveDate,
    pub t_scale_days: f64,
    pub y_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyParams {
    pub interval_width: f64,
    pub sigma_obs: f64,
}

/// Pre-fitted trend + seasonality model.
///
/// `predict` evaluates
/// `yhat = trend * (1 + multiplicative) + y_scale * additive` and builds a
/// symmetric interval from the observation noise plus a trend drift term that
/// grows with the distance past the end of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    pub metadata: ModelMetadata,
    pub history: Vec<Observation>,
    pub scaling: Scaling,
    pub trend: TrendParams,
    #[serde(default)]
    pub seasonalities: Vec<SeasonalityParams>,
    pub uncertainty: UncertaintyParams,
}

impl ForecastModel {
    pub fn validate(&self) -> std::result::Result<(), LoadFailure> {
        if self.metadata.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(LoadFailure::UnsupportedVersion {
                found: self.metadata.format_version,
                supported: SUPPORTED_FORMAT_VERSION,
            });
        }
        if self.history.is_empty() {
            return Err(LoadFailure::Invalid("history is empty".to_string()));
        }
        if self.history.windows(2).any(|w| w[1].ds <= w[0].ds) {
            return Err(LoadFailure::Invalid("history dates must be strictly increasing".to_string()));
        }
        if self.history.iter().any(|o| !o.y.is_finite()) {
            return Err(LoadFailure::Invalid("history contains non-finite values".to_string()));
        }
        if !(self.scaling.t_scale_days.is_finite() && self.scaling.t_scale_days > 0.0) {
            return Err(LoadFailure::Invalid("scaling.t_scale_days must be positive".to_string()));
        }
        if !(self.scaling.y_scale.is_finite() && self.scaling.y_scale > 0.0) {
            return Err(LoadFailure::Invalid("scaling.y_scale must be positive".to_string()));
        }
        let width = self.uncertainty.interval_width;
        if !(width > 0.0 && width < 1.0) {
            return Err(LoadFailure::Invalid(format!(
                "interval_width must be in (0, 1), got {}",
                width
            )));
        }
        if !(self.uncertainty.sigma_obs.is_finite() && self.uncertainty.sigma_obs >= 0.0) {
            return Err(LoadFailure::Invalid("sigma_obs must be non-negative".to_string()));
        }
        self.trend.validate().map_err(LoadFailure::Invalid)?;
        for seasonality in &self.seasonalities {
            seasonality.validate().map_err(LoadFailure::Invalid)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    pub fn value_label(&self) -> Option<&str> {
        self.metadata.value_label.as_deref()
    }

    fn scaled_time(&self, ds: NaiveDate) -> f64 {
        (ds - self.scaling.t_start).num_days() as f64 / self.scaling.t_scale_days
    }

    /// Two-sided normal quantile for the configured interval width
    pub fn z_score(&self) -> Result<f64> {
        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::Prediction(e.to_string()))?;
        Ok(normal.inverse_cdf(0.5 + self.uncertainty.interval_width / 2.0))
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.metadata.name.clone(),
            format_version: self.metadata.format_version,
            trained_at: self.metadata.trained_at,
            value_label: self.metadata.value_label.clone(),
            observations: self.history.len(),
            history_start: self.history.first().map(|o| o.ds),
            history_end: self.history.last().map(|o| o.ds),
            seasonalities: self.seasonalities.iter().map(|s| s.name.clone()).collect(),
            changepoints: self.trend.changepoints.len(),
            interval_width: self.uncertainty.interval_width,
        }
    }
}

impl Forecaster for ForecastModel {
    fn history_end(&self) -> Option<NaiveDate> {
        self.history.last().map(|o| o.ds)
    }

    fn make_future_timeline(&self, periods: u32, frequency: Frequency) -> Result<FutureTimeline> {
        let last = self
            .history_end()
            .ok_or_else(|| ForecastError::Prediction("model has no history".to_string()))?;

        let future = match frequency {
            Frequency::Daily => calendar::days_after(last, periods as usize),
            Frequency::Monthly => calendar::month_ends_after(last, periods as usize),
        }
        .ok_or_else(|| {
            ForecastError::Prediction(format!("{} {} periods after {} overflow the calendar", periods, frequency, last))
        })?;

        let mut dates: Vec<NaiveDate> = self.history.iter().map(|o| o.ds).collect();
        let history_len = dates.len();
        dates.extend(future);

        debug!("Timeline: {} historical + {} future dates", history_len, periods);
        Ok(FutureTimeline::new(dates, history_len))
    }

    fn predict(&self, timeline: &FutureTimeline) -> Result<ForecastResult> {
        if timeline.is_empty() {
            return Ok(ForecastResult::default());
        }
        let dates = timeline.dates();
        let n = dates.len();

        let days: Vec<f64> = dates.iter().map(|d| calendar::days_since_epoch(*d)).collect();
        let mut additive = Array1::<f64>::zeros(n);
        let mut multiplicative = Array1::<f64>::zeros(n);
        for seasonality in &self.seasonalities {
            let component = seasonality.component(&days);
            match seasonality.mode {
                SeasonalityMode::Additive => additive += &component,
                SeasonalityMode::Multiplicative => multiplicative += &component,
            }
        }

        let z = self.z_score()?;
        let y_scale = self.scaling.y_scale;
        let sigma = self.uncertainty.sigma_obs;
        let drift_rate = self.trend.mean_abs_delta();
        let t_end = self
            .history_end()
            .map(|d| self.scaled_time(d))
            .unwrap_or(f64::INFINITY);

        let mut rows = Vec::with_capacity(n);
        for (i, &ds) in dates.iter().enumerate() {
            let t = self.scaled_time(ds);
            let trend = self.trend.value_at(t) * y_scale;
            let yhat = trend * (1.0 + multiplicative[i]) + additive[i] * y_scale;
            if !yhat.is_finite() {
                return Err(ForecastError::Prediction(format!("non-finite prediction at {}", ds)));
            }

            let drift = drift_rate * (t - t_end).max(0.0);
            let half_width = z * y_scale * (sigma * sigma + drift * drift).sqrt();

            rows.push(ForecastRow {
                ds,
                yhat,
                yhat_lower: yhat - half_width,
                yhat_upper: yhat + half_width,
                trend,
            });
        }

        Ok(ForecastResult::new(rows))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub format_version: u32,
    pub trained_at: Option<DateTime<Utc>>,
    pub value_label: Option<String>,
    pub observations: usize,
    pub history_start: Option<NaiveDate>,
    pub history_end: Option<NaiveDate>,
    pub seasonalities: Vec<String>,
    pub changepoints: usize,
    pub interval_width: f64,
}

impl ModelSummary {
    pub fn print_summary(&self) {
        let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

        println!("\n{}", "=".repeat(60));
        println!("                    MODEL SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Name:               {}", self.name);
        println!("Format Version:     {}", self.format_version);
        if let Some(trained_at) = self.trained_at {
            println!("Trained At:         {}", trained_at.format("%Y-%m-%d %H:%M UTC"));
        }
        println!("{}", "-".repeat(60));
        println!("HISTORY");
        println!("  Observations:       {}", self.observations);
        println!("  Start:              {}", fmt_date(self.history_start));
        println!("  End:                {}", fmt_date(self.history_end));
        println!("{}", "-".repeat(60));
        println!("COMPONENTS");
        println!("  Changepoints:       {}", self.changepoints);
        println!("  Seasonalities:      {}", if self.seasonalities.is_empty() {
            "none".to_string()
        } else {
            self.seasonalities.join(", ")
        });
        println!("  Interval Width:     {:.0}%", self.interval_width * 100.0);
        println!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_model;
    use crate::model::trend::Growth;

    #[test]
    fn test_sample_model_is_valid() {
        assert_eq!(sample_model().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_version_mismatch() {
        let mut model = sample_model();
        model.metadata.format_version = 2;
        assert_eq!(
            model.validate(),
            Err(LoadFailure::UnsupportedVersion { found: 2, supported: SUPPORTED_FORMAT_VERSION })
        );
    }

    #[test]
    fn test_validate_rejects_unsorted_history() {
        let mut model = sample_model();
        model.history.swap(0, 1);
        assert!(matches!(model.validate(), Err(LoadFailure::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_interval_width() {
        let mut model = sample_model();
        model.uncertainty.interval_width = 1.0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_z_score_for_eighty_percent() {
        let model = sample_model();
        let z = model.z_score().unwrap();
        assert!((z - 1.2816).abs() < 1e-3);
    }

    #[test]
    fn test_monthly_timeline_appends_month_ends() {
        let model = sample_model();
        let timeline = model.make_future_timeline(3, Frequency::Monthly).unwrap();

        assert_eq!(timeline.history_len(), model.history().len());
        assert_eq!(timeline.len(), model.history().len() + 3);
        for date in timeline.future_dates() {
            assert!(calendar::is_month_end(*date));
        }
    }

    #[test]
    fn test_predict_covers_every_timeline_date() {
        let model = sample_model();
        let timeline = model.make_future_timeline(6, Frequency::Monthly).unwrap();
        let result = model.predict(&timeline).unwrap();

        assert_eq!(result.len(), timeline.len());
        for (row, date) in result.rows().iter().zip(timeline.dates()) {
            assert_eq!(row.ds, *date);
            assert!(row.yhat_lower <= row.yhat && row.yhat <= row.yhat_upper);
        }
    }

    #[test]
    fn test_interval_widens_past_history() {
        let model = sample_model();
        let timeline = model.make_future_timeline(24, Frequency::Monthly).unwrap();
        let result = model.predict(&timeline).unwrap();
        let width = |r: &ForecastRow| r.yhat_upper - r.yhat_lower;

        let rows = result.rows();
        let last_hist = &rows[timeline.history_len() - 1];
        let last = rows.last().unwrap();
        assert!(width(last) > width(last_hist));
    }

    const Z_80: f64 = 1.281_551_565_5;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(1970, 1, d).unwrap()
    }

    /// Five daily observations from the epoch, t in [0, 1], y_scale 100 and a
    /// flat trend of 50. A 4-day period puts day 1 at sin = 1 and day 2 at cos = -1.
    fn toy_model(modes: &[SeasonalityMode]) -> ForecastModel {
        ForecastModel {
            metadata: ModelMetadata {
                name: "toy".to_string(),
                format_version: SUPPORTED_FORMAT_VERSION,
                trained_at: None,
                value_label: None,
            },
            history: (1..=5).map(|d| Observation { ds: day(d), y: 50.0 }).collect(),
            scaling: Scaling { t_start: day(1), t_scale_days: 4.0, y_scale: 100.0 },
            trend: TrendParams {
                growth: Growth::Flat,
                k: 0.0,
                m: 0.5,
                changepoints: vec![],
                deltas: vec![],
            },
            seasonalities: modes
                .iter()
                .map(|&mode| SeasonalityParams {
                    name: format!("{:?}", mode),
                    period_days: 4.0,
                    fourier_order: 1,
                    mode,
                    coefficients: vec![0.1, 0.2],
                })
                .collect(),
            uncertainty: UncertaintyParams { interval_width: 0.8, sigma_obs: 0.02 },
        }
    }

    fn predict_on(model: &ForecastModel, dates: &[NaiveDate]) -> Vec<ForecastRow> {
        let timeline = FutureTimeline::new(dates.to_vec(), 0);
        model.predict(&timeline).unwrap().rows().to_vec()
    }

    #[test]
    fn test_additive_seasonality_values() {
        let model = toy_model(&[SeasonalityMode::Additive]);
        assert_eq!(model.validate(), Ok(()));
        let rows = predict_on(&model, &[day(2), day(3)]);

        // 50 + 100 * (0.1 * sin + 0.2 * cos)
        assert!((rows[0].trend - 50.0).abs() < 1e-9);
        assert!((rows[0].yhat - 60.0).abs() < 1e-6);
        assert!((rows[1].yhat - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiplicative_seasonality_scales_trend() {
        let model = toy_model(&[SeasonalityMode::Multiplicative]);
        let rows = predict_on(&model, &[day(2), day(3)]);

        // 50 * (1 + 0.1 * sin + 0.2 * cos)
        assert!((rows[0].yhat - 55.0).abs() < 1e-6);
        assert!((rows[1].yhat - 40.0).abs() < 1e-6);
        assert!((rows[1].trend - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_seasonality_modes_combine() {
        let model = toy_model(&[SeasonalityMode::Additive, SeasonalityMode::Multiplicative]);
        let rows = predict_on(&model, &[day(2)]);
        // 50 * 1.1 + 100 * 0.1
        assert!((rows[0].yhat - 65.0).abs() < 1e-6);
    }

    #[test]
    fn test_interval_half_width_inside_history() {
        let model = toy_model(&[SeasonalityMode::Additive]);
        let rows = predict_on(&model, &[day(2)]);

        let expected = Z_80 * 100.0 * 0.02;
        assert!((rows[0].yhat_upper - rows[0].yhat - expected).abs() < 1e-3);
        assert!((rows[0].yhat - rows[0].yhat_lower - expected).abs() < 1e-3);
    }

    #[test]
    fn test_interval_half_width_includes_trend_drift() {
        let mut model = toy_model(&[]);
        model.trend = TrendParams {
            growth: Growth::Linear,
            k: 0.1,
            m: 0.5,
            changepoints: vec![0.5],
            deltas: vec![0.2],
        };
        // Day 9 is t = 2, one scaled unit past the history end at t = 1
        let rows = predict_on(&model, &[day(9)]);

        // slope 0.3, offset 0.5 - 0.5 * 0.2 = 0.4
        assert!((rows[0].trend - 100.0).abs() < 1e-6);
        assert!((rows[0].yhat - 100.0).abs() < 1e-6);

        let drift: f64 = 0.2 * 1.0;
        let expected = Z_80 * 100.0 * (0.02_f64.powi(2) + drift.powi(2)).sqrt();
        assert!((rows[0].yhat_upper - rows[0].yhat - expected).abs() < 1e-3);
        assert!((expected - 25.759).abs() < 1e-2);
    }

    #[test]
    fn test_zero_coefficients_leave_trend_unchanged() {
        let mut model = sample_model();
        model.seasonalities.clear();
        let timeline = model.make_future_timeline(1, Frequency::Monthly).unwrap();
        let base = model.predict(&timeline).unwrap();

        model.seasonalities.push(SeasonalityParams {
            name: "flat_boost".to_string(),
            period_days: 365.25,
            fourier_order: 1,
            mode: SeasonalityMode::Multiplicative,
            coefficients: vec![0.0, 0.0],
        });
        let same = model.predict(&timeline).unwrap();
        assert_eq!(base, same);
    }

    #[test]
    fn test_empty_timeline_predicts_nothing() {
        let model = sample_model();
        let result = model.predict(&FutureTimeline::default()).unwrap();
        assert!(result.is_empty());
    }
}
