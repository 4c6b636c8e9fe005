use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    Linear,
    Flat,
}

/// Fitted piecewise-linear trend, in scaled time and scaled values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    pub growth: Growth,
    pub k: f64,
    pub m: f64,
    #[serde(default)]
    pub changepoints: Vec<f64>,
    #[serde(default)]
    pub deltas: Vec<f64>,
}

impl TrendParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.k.is_finite() || !self.m.is_finite() {
            return Err("trend k and m must be finite".to_string());
        }
        if self.changepoints.len() != self.deltas.len() {
            return Err(format!(
                "trend has {} changepoints but {} deltas",
                self.changepoints.len(),
                self.deltas.len()
            ));
        }
        if self.changepoints.windows(2).any(|w| w[1] < w[0]) {
            return Err("trend changepoints must be sorted".to_string());
        }
        if self.changepoints.iter().chain(&self.deltas).any(|v| !v.is_finite()) {
            return Err("trend changepoints and deltas must be finite".to_string());
        }
        Ok(())
    }

    /// Scaled trend at scaled time `t`. Every changepoint at or before `t`
    /// adds its slope delta and shifts the offset to keep the trend continuous.
    pub fn value_at(&self, t: f64) -> f64 {
        match self.growth {
            Growth::Flat => self.m,
            Growth::Linear => {
                let (k, m) = self
                    .changepoints
                    .iter()
                    .zip(&self.deltas)
                    .filter(|&(&s, _)| t >= s)
                    .fold((self.k, self.m), |(k, m), (&s, &d)| (k + d, m - s * d));
                k * t + m
            }
        }
    }

    /// Average absolute rate change, used to widen intervals past the history
    pub fn mean_abs_delta(&self) -> f64 {
        if self.deltas.is_empty() {
            return 0.0;
        }
        self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64
    }
}
