use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::ForecastSession;
use crate::model::ForecastModel;
use crate::presenter::ChartRenderer;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ForecastSession>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(session: Arc<ForecastSession>, config: Arc<AppConfig>) -> Self {
        Self { session, config }
    }

    pub fn renderer_for(&self, model: &ForecastModel) -> ChartRenderer {
        let chart = &self.config.chart;
        ChartRenderer::new(chart.width, chart.height, chart.resolve_label(model.value_label()))
    }
}
