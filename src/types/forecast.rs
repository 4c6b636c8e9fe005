use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One historical observation the model was fitted on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ds: NaiveDate,
    pub y: f64,
}

/// Dates to predict: the full history followed by the generated future periods
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FutureTimeline {
    dates: Vec<NaiveDate>,
    history_len: usize,
}

impl FutureTimeline {
    pub fn new(dates: Vec<NaiveDate>, history_len: usize) -> Self {
        Self {
            history_len: history_len.min(dates.len()),
            dates,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[cfg(test)]
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    #[cfg(test)]
    pub fn future_dates(&self) -> &[NaiveDate] {
        &self.dates[self.history_len..]
    }

    pub fn history_end(&self) -> Option<NaiveDate> {
        self.history_len
            .checked_sub(1)
            .and_then(|idx| self.dates.get(idx).copied())
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
}

/// Full prediction over a timeline, in chronological order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ForecastResult {
    rows: Vec<ForecastRow>,
}

impl ForecastResult {
    pub fn new(rows: Vec<ForecastRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows of a forecast result selected for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayWindow {
    title: String,
    rows: Vec<ForecastRow>,
}

impl DisplayWindow {
    /// Pure subset selection: keeps result order, never reorders or edits rows
    pub fn select<P>(result: &ForecastResult, title: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&ForecastRow) -> bool,
    {
        Self {
            title: title.into(),
            rows: result.rows().iter().filter(|r| predicate(r)).copied().collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.ds)
    }

    #[cfg(test)]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.ds)
    }

    /// Lowest lower bound and highest upper bound across the window
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        if self.rows.is_empty() {
            return None;
        }
        let lo = self.rows.iter().map(|r| r.yhat_lower.min(r.yhat)).fold(f64::INFINITY, f64::min);
        let hi = self.rows.iter().map(|r| r.yhat_upper.max(r.yhat)).fold(f64::NEG_INFINITY, f64::max);
        Some((lo, hi))
    }
}
