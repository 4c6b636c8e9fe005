use chrono::{Days, NaiveDate};
use plotters::prelude::*;

use crate::error::{ForecastError, Result};
use crate::model::calendar::days_since_epoch;
use crate::types::{DisplayWindow, Observation};

const INTERVAL_COLOR: RGBColor = RGBColor(135, 206, 235);
const INTERVAL_ALPHA: f64 = 0.3;

fn render_err<E: std::fmt::Display>(stage: &str) -> impl Fn(E) -> ForecastError + '_ {
    move |e| ForecastError::Render(format!("{}: {}", stage, e))
}

/// Renders forecast windows and history as SVG documents
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    value_label: String,
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32, value_label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            value_label: value_label.into(),
        }
    }

    /// Forecast line with its shaded confidence interval
    pub fn forecast_svg(&self, window: &DisplayWindow) -> Result<String> {
        let rows = window.rows();
        if rows.is_empty() {
            return Err(ForecastError::Render("forecast window is empty".to_string()));
        }
        let (lo, hi) = window
            .value_bounds()
            .ok_or_else(|| ForecastError::Render("forecast window is empty".to_string()))?;
        let x_range = day_range(rows.iter().map(|r| r.ds));
        let y_range = pad(lo, hi);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err("fill"))?;

            let mut chart = ChartBuilder::on(&root)
                .caption(window.title(), ("sans-serif", 24))
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, y_range)
                .map_err(render_err("chart build"))?;

            chart
                .configure_mesh()
                .x_desc("Date")
                .y_desc(self.value_label.as_str())
                .x_label_formatter(&|x: &f64| format_day(*x))
                .draw()
                .map_err(render_err("grid"))?;

            let mut band: Vec<(f64, f64)> =
                rows.iter().map(|r| (day(r.ds), r.yhat_upper)).collect();
            band.extend(rows.iter().rev().map(|r| (day(r.ds), r.yhat_lower)));

            chart
                .draw_series(std::iter::once(Polygon::new(
                    band,
                    INTERVAL_COLOR.mix(INTERVAL_ALPHA).filled(),
                )))
                .map_err(render_err("interval"))?
                .label("Confidence Interval")
                .legend(|(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 20, y + 5)], INTERVAL_COLOR.mix(INTERVAL_ALPHA).filled())
                });

            chart
                .draw_series(LineSeries::new(
                    rows.iter().map(|r| (day(r.ds), r.yhat)),
                    BLUE.stroke_width(2),
                ))
                .map_err(render_err("forecast line"))?
                .label("Forecast")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_err("legend"))?;

            root.present().map_err(render_err("present"))?;
        }
        Ok(svg)
    }

    pub fn history_svg(&self, history: &[Observation]) -> Result<String> {
        if history.is_empty() {
            return Err(ForecastError::Render("history is empty".to_string()));
        }
        let lo = history.iter().map(|o| o.y).fold(f64::INFINITY, f64::min);
        let hi = history.iter().map(|o| o.y).fold(f64::NEG_INFINITY, f64::max);
        let x_range = day_range(history.iter().map(|o| o.ds));

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err("fill"))?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Historical Sales Data", ("sans-serif", 24))
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, pad(lo, hi))
                .map_err(render_err("chart build"))?;

            chart
                .configure_mesh()
                .x_desc("Date")
                .y_desc(self.value_label.as_str())
                .x_label_formatter(&|x: &f64| format_day(*x))
                .draw()
                .map_err(render_err("grid"))?;

            chart
                .draw_series(LineSeries::new(
                    history.iter().map(|o| (day(o.ds), o.y)),
                    BLACK.stroke_width(2),
                ))
                .map_err(render_err("history line"))?
                .label("Historical Sales")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_err("legend"))?;

            root.present().map_err(render_err("present"))?;
        }
        Ok(svg)
    }
}

fn day(date: NaiveDate) -> f64 {
    days_since_epoch(date)
}

fn format_day(x: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    if x < 0.0 {
        return String::new();
    }
    epoch
        .checked_add_days(Days::new(x.round() as u64))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Plotting range over dates; a single date gets a day of room either side
fn day_range(dates: impl Iterator<Item = NaiveDate> + Clone) -> std::ops::Range<f64> {
    let lo = dates.clone().map(day).fold(f64::INFINITY, f64::min);
    let hi = dates.map(day).fold(f64::NEG_INFINITY, f64::max);
    if hi > lo {
        lo..hi
    } else {
        (lo - 1.0)..(hi + 1.0)
    }
}

fn pad(lo: f64, hi: f64) -> std::ops::Range<f64> {
    let margin = ((hi - lo) * 0.05).max(hi.abs() * 0.01).max(1.0);
    (lo - margin)..(hi + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ForecastRequester, WindowPolicy};
    use crate::model::fixtures::sample_model;
    use crate::types::{ForecastResult, ForecastRow, Frequency, Horizon, HorizonLimits};

    fn renderer() -> ChartRenderer {
        ChartRenderer::new(800, 480, "Sales")
    }

    #[test]
    fn test_forecast_chart_has_labels() {
        let model = sample_model();
        let requester = ForecastRequester::new(&model, HorizonLimits::default(), WindowPolicy::FutureOnly);
        let outcome = requester
            .request(&Horizon::Periods { count: 12, frequency: Frequency::Monthly })
            .unwrap();

        let svg = renderer().forecast_svg(&outcome.window).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Forecast for Next 12 Months"));
        assert!(svg.contains("Confidence Interval"));
        assert!(svg.contains("Date"));
        assert!(svg.contains("Sales"));
    }

    #[test]
    fn test_single_row_window_renders() {
        let result = ForecastResult::new(vec![ForecastRow {
            ds: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            yhat: 10.0,
            yhat_lower: 10.0,
            yhat_upper: 10.0,
            trend: 10.0,
        }]);
        let window = DisplayWindow::select(&result, "Forecast for Next 1 Month", |_| true);
        assert!(renderer().forecast_svg(&window).is_ok());
    }

    #[test]
    fn test_empty_window_is_render_error() {
        let window = DisplayWindow::select(&ForecastResult::default(), "empty", |_| true);
        assert!(matches!(renderer().forecast_svg(&window), Err(ForecastError::Render(_))));
    }

    #[test]
    fn test_history_chart_title() {
        let model = sample_model();
        let svg = renderer().history_svg(model.history()).unwrap();
        assert!(svg.contains("Historical Sales Data"));
        assert!(svg.contains("Historical Sales"));
    }

    #[test]
    fn test_day_labels_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(format_day(day(date)), "2024-02-29");
    }
}
