use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::error::{ForecastError, Result};
use crate::types::{DisplayWindow, ForecastRow};

pub const EXPORT_FILE_NAME: &str = "forecasted_sales.csv";
pub const EXPORT_MIME: &str = "text/csv";

const HEADER: [&str; 4] = ["ds", "yhat", "yhat_lower", "yhat_upper"];

fn export_err(e: impl std::fmt::Display) -> ForecastError {
    ForecastError::Export(e.to_string())
}

fn write_rows<W: std::io::Write>(writer: W, rows: &[ForecastRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER).map_err(export_err)?;
    for row in rows {
        writer
            .write_record([
                row.ds.format("%Y-%m-%d").to_string(),
                row.yhat.to_string(),
                row.yhat_lower.to_string(),
                row.yhat_upper.to_string(),
            ])
            .map_err(export_err)?;
    }
    writer.flush().map_err(export_err)
}

/// CSV document for a window: header then one line per row
pub fn window_to_csv(window: &DisplayWindow) -> Result<String> {
    let mut output = Vec::new();
    write_rows(&mut output, window.rows())?;
    String::from_utf8(output).map_err(export_err)
}

pub fn write_window_csv(window: &DisplayWindow, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ForecastError::Export(format!("{}: {}", path.display(), e)))?;
    write_rows(file, window.rows())?;
    info!("Wrote {} forecast rows to {}", window.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForecastResult;
    use chrono::NaiveDate;

    fn window(n: u32) -> DisplayWindow {
        let result = ForecastResult::new(
            (1..=n)
                .map(|d| ForecastRow {
                    ds: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    yhat: 10.5,
                    yhat_lower: 9.0,
                    yhat_upper: 12.0,
                    trend: 10.0,
                })
                .collect(),
        );
        DisplayWindow::select(&result, "Forecast", |_| true)
    }

    #[test]
    fn test_three_rows_give_four_lines() {
        let csv = window_to_csv(&window(3)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "ds,yhat,yhat_lower,yhat_upper");
        assert_eq!(lines[1], "2024-03-01,10.5,9,12");
    }

    #[test]
    fn test_empty_window_is_header_only() {
        let csv = window_to_csv(&window(0)).unwrap();
        assert_eq!(csv, "ds,yhat,yhat_lower,yhat_upper\n");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        write_window_csv(&window(2), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn test_unwritable_path_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(EXPORT_FILE_NAME);
        assert!(matches!(write_window_csv(&window(1), &path), Err(ForecastError::Export(_))));
    }
}
