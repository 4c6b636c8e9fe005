use tracing::{debug, info};

use super::window::{select_window, WindowPolicy};
use crate::error::{ForecastError, Result};
use crate::model::Forecaster;
use crate::types::{DisplayWindow, ForecastResult, Frequency, FutureTimeline, Horizon, HorizonLimits};

/// Everything produced by one forecast request
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub horizon: Horizon,
    pub timeline: FutureTimeline,
    pub result: ForecastResult,
    pub window: DisplayWindow,
}

/// Turns a horizon into a forecast window using a loaded model
pub struct ForecastRequester<'a, F: Forecaster + ?Sized> {
    model: &'a F,
    limits: HorizonLimits,
    policy: WindowPolicy,
}

impl<'a, F: Forecaster + ?Sized> ForecastRequester<'a, F> {
    pub fn new(model: &'a F, limits: HorizonLimits, policy: WindowPolicy) -> Self {
        Self { model, limits, policy }
    }

    /// Validates the horizon before anything is predicted; an invalid horizon
    /// never reaches the model.
    pub fn request(&self, horizon: &Horizon) -> Result<ForecastOutcome> {
        horizon.validate(&self.limits)?;
        let (periods, frequency) = self.future_periods(horizon)?;

        info!("Generating forecast: {} ({} {} steps)", horizon, periods, frequency);

        let timeline = self.model.make_future_timeline(periods, frequency)?;
        let result = self.model.predict(&timeline)?;
        if result.len() != timeline.len() {
            return Err(ForecastError::Prediction(format!(
                "model returned {} rows for {} timeline dates",
                result.len(),
                timeline.len()
            )));
        }

        let window = select_window(&result, &timeline, horizon, self.policy);
        debug!(
            "Window '{}' holds {} of {} rows (policy: {})",
            window.title(),
            window.len(),
            result.len(),
            self.policy
        );

        Ok(ForecastOutcome {
            horizon: *horizon,
            timeline,
            result,
            window,
        })
    }

    /// Number of future steps needed to reach the end of the horizon
    fn future_periods(&self, horizon: &Horizon) -> Result<(u32, Frequency)> {
        match *horizon {
            Horizon::Periods { count, frequency } => Ok((count, frequency)),
            Horizon::Range { end, .. } => {
                let history_end = self
                    .model
                    .history_end()
                    .ok_or_else(|| ForecastError::Prediction("model has no history".to_string()))?;
                let days = (end - history_end).num_days().max(0);
                if days > i64::from(self.limits.max_range_days) {
                    return Err(ForecastError::invalid_horizon(format!(
                        "end date {} is {} days past the end of the history ({}); the maximum is {}",
                        end, days, history_end, self.limits.max_range_days
                    )));
                }
                Ok((days as u32, Frequency::Daily))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{daily_model, sample_model};
    use crate::model::MockForecaster;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(count: u32) -> Horizon {
        Horizon::Periods { count, frequency: Frequency::Monthly }
    }

    #[test]
    fn test_monthly_periods_append_exactly_n_rows() {
        let model = sample_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::FutureOnly);

        for n in [1u32, 2, 12, 37, 60] {
            let outcome = requester.request(&monthly(n)).unwrap();
            let future = outcome.timeline.future_dates();
            assert_eq!(future.len(), n as usize);
            assert!(outcome.timeline.dates().windows(2).all(|w| w[0] < w[1]));
            assert_eq!(outcome.window.len(), n as usize);
        }
    }

    #[test]
    fn test_single_period_window_is_not_empty() {
        let model = sample_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::TrailingApprox);

        let outcome = requester.request(&monthly(1)).unwrap();
        assert!(!outcome.window.is_empty());
        assert_eq!(outcome.window.last_date(), Some(date(2024, 1, 31)));
    }

    #[test]
    fn test_invalid_count_never_calls_predict() {
        let mut mock = MockForecaster::new();
        mock.expect_history_end().never();
        mock.expect_make_future_timeline().never();
        mock.expect_predict().never();

        let requester = ForecastRequester::new(&mock, HorizonLimits::default(), WindowPolicy::FutureOnly);
        let err = requester.request(&monthly(0)).unwrap_err();
        assert!(err.is_invalid_horizon());

        let err = requester.request(&monthly(61)).unwrap_err();
        assert!(err.is_invalid_horizon());
    }

    #[test]
    fn test_reversed_range_never_calls_predict() {
        let mut mock = MockForecaster::new();
        mock.expect_make_future_timeline().never();
        mock.expect_predict().never();

        let requester = ForecastRequester::new(&mock, HorizonLimits::default(), WindowPolicy::FutureOnly);
        let horizon = Horizon::Range { start: date(2024, 3, 1), end: date(2024, 2, 1) };
        assert!(requester.request(&horizon).unwrap_err().is_invalid_horizon());
    }

    #[test]
    fn test_range_window_has_no_gaps() {
        let model = daily_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::FutureOnly);
        let (start, end) = (date(2023, 3, 15), date(2023, 4, 20));

        let outcome = requester.request(&Horizon::Range { start, end }).unwrap();

        let expected: Vec<_> = outcome
            .result
            .rows()
            .iter()
            .filter(|r| r.ds >= start && r.ds <= end)
            .copied()
            .collect();
        assert_eq!(outcome.window.rows(), expected.as_slice());
        assert_eq!(outcome.window.first_date(), Some(start));
        assert_eq!(outcome.window.last_date(), Some(end));
        // 17 historical days in March plus 20 forecast days in April
        assert_eq!(outcome.window.len(), 37);
    }

    #[test]
    fn test_range_inside_history_adds_no_future_rows() {
        let model = daily_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::FutureOnly);

        let outcome = requester
            .request(&Horizon::Range { start: date(2023, 1, 10), end: date(2023, 1, 12) })
            .unwrap();
        assert!(outcome.timeline.future_dates().is_empty());
        assert_eq!(outcome.window.len(), 3);
    }

    #[test]
    fn test_range_far_past_history_is_rejected() {
        let model = daily_model();
        let limits = HorizonLimits { max_periods: 60, max_range_days: 365 };
        let requester = ForecastRequester::new(&model, limits, WindowPolicy::FutureOnly);

        let err = requester
            .request(&Horizon::Range { start: date(2030, 1, 1), end: date(2030, 1, 31) })
            .unwrap_err();
        assert!(err.is_invalid_horizon());
    }

    #[test]
    fn test_requests_are_deterministic() {
        let model = sample_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::FutureOnly);

        let first = requester.request(&monthly(18)).unwrap();
        let second = requester.request(&monthly(18)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_prediction_is_rejected() {
        let mut mock = MockForecaster::new();
        mock.expect_make_future_timeline()
            .returning(|_, _| Ok(FutureTimeline::new(vec![NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()], 0)));
        mock.expect_predict().times(1).returning(|_| Ok(ForecastResult::default()));

        let requester = ForecastRequester::new(&mock, HorizonLimits::default(), WindowPolicy::FutureOnly);
        let err = requester.request(&monthly(1)).unwrap_err();
        assert!(matches!(err, ForecastError::Prediction(_)));
    }
}
