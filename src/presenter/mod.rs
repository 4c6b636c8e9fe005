pub mod table;
pub mod chart;
pub mod export;

pub use table::{forecast_table, history_table};
pub use chart::ChartRenderer;
pub use export::{window_to_csv, write_window_csv, EXPORT_FILE_NAME, EXPORT_MIME};
