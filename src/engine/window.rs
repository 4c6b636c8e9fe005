use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DisplayWindow, ForecastResult, FutureTimeline, Horizon};

/// How rows of a period-count forecast are selected for display.
/// Explicit date ranges always select `start <= ds <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Exactly the generated future periods
    #[default]
    FutureOnly,
    /// Rows after `max(timeline) - 30 * count` days. Kept for parity with
    /// legacy output; over- or under-includes rows near month boundaries.
    TrailingApprox,
}

impl WindowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowPolicy::FutureOnly => "future_only",
            WindowPolicy::TrailingApprox => "trailing_approx",
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Select the display window for `horizon` out of a full forecast result
pub fn select_window(
    result: &ForecastResult,
    timeline: &FutureTimeline,
    horizon: &Horizon,
    policy: WindowPolicy,
) -> DisplayWindow {
    let title = horizon.title();
    match (*horizon, policy) {
        (Horizon::Range { start, end }, _) => {
            DisplayWindow::select(result, title, |r| r.ds >= start && r.ds <= end)
        }
        (Horizon::Periods { .. }, WindowPolicy::FutureOnly) => match timeline.history_end() {
            Some(history_end) => DisplayWindow::select(result, title, |r| r.ds > history_end),
            None => DisplayWindow::select(result, title, |_| true),
        },
        (Horizon::Periods { count, .. }, WindowPolicy::TrailingApprox) => {
            match trailing_cutoff(timeline.max_date(), count) {
                Some(cutoff) => DisplayWindow::select(result, title, |r| r.ds > cutoff),
                None => DisplayWindow::select(result, title, |_| true),
            }
        }
    }
}

fn trailing_cutoff(max_date: Option<NaiveDate>, count: u32) -> Option<NaiveDate> {
    max_date?.checked_sub_days(Days::new(30 * u64::from(count)))
}
