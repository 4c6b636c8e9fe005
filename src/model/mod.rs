pub mod calendar;
pub mod trend;
pub mod seasonality;
pub mod fitted;
pub mod loader;

pub use fitted::ForecastModel;
pub use loader::{load_model, FileModelSource, ModelSource};

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{ForecastResult, Frequency, FutureTimeline};

/// What the forecast requester needs from a loaded model
#[cfg_attr(test, mockall::automock)]
pub trait Forecaster {
    /// Last historical date the model was fitted on
    fn history_end(&self) -> Option<NaiveDate>;

    /// History dates followed by `periods` generated future dates
    fn make_future_timeline(&self, periods: u32, frequency: Frequency) -> Result<FutureTimeline>;

    fn predict(&self, timeline: &FutureTimeline) -> Result<ForecastResult>;
}
