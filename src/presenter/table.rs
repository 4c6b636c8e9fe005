use std::fmt::Write;

use crate::types::{DisplayWindow, Observation};

/// Plain-text table of a forecast window: `ds yhat yhat_lower yhat_upper`
pub fn forecast_table(window: &DisplayWindow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", window.title());
    let _ = writeln!(
        out,
        "{:<12} {:>14} {:>14} {:>14}",
        "ds", "yhat", "yhat_lower", "yhat_upper"
    );
    let _ = writeln!(out, "{}", "-".repeat(57));

    for row in window.rows() {
        let _ = writeln!(
            out,
            "{:<12} {:>14.2} {:>14.2} {:>14.2}",
            row.ds.format("%Y-%m-%d"),
            row.yhat,
            row.yhat_lower,
            row.yhat_upper
        );
    }

    if window.is_empty() {
        let _ = writeln!(out, "(no rows)");
    }
    out
}

/// Plain-text table of the fitted history: `ds y`
pub fn history_table(history: &[Observation]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>14}", "ds", "y");
    let _ = writeln!(out, "{}", "-".repeat(27));
    for obs in history {
        let _ = writeln!(out, "{:<12} {:>14.2}", obs.ds.format("%Y-%m-%d"), obs.y);
    }
    out
}
