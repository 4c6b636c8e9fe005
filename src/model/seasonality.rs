use ndarray::{aview1, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Fitted Fourier seasonality block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityParams {
    pub name: String,
    pub period_days: f64,
    pub fourier_order: usize,
    #[serde(default)]
    pub mode: SeasonalityMode,
    pub coefficients: Vec<f64>,
}

impl SeasonalityParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.period_days.is_finite() && self.period_days > 0.0) {
            return Err(format!("seasonality '{}' needs a positive period", self.name));
        }
        if self.fourier_order == 0 {
            return Err(format!("seasonality '{}' needs fourier_order >= 1", self.name));
        }
        if self.coefficients.len() != 2 * self.fourier_order {
            return Err(format!(
                "seasonality '{}' has {} coefficients, expected {}",
                self.name,
                self.coefficients.len(),
                2 * self.fourier_order
            ));
        }
        if self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(format!("seasonality '{}' has non-finite coefficients", self.name));
        }
        Ok(())
    }

    /// Scaled seasonal contribution for each day offset
    pub fn component(&self, days: &[f64]) -> Array1<f64> {
        fourier_features(days, self.period_days, self.fourier_order).dot(&aview1(&self.coefficients))
    }
}

/// Design matrix with interleaved `sin, cos` columns for harmonics `1..=order`
pub fn fourier_features(days: &[f64], period: f64, order: usize) -> Array2<f64> {
    let mut features = Array2::<f64>::zeros((days.len(), 2 * order));
    for (i, &day) in days.iter().enumerate() {
        for j in 0..order {
            let arg = 2.0 * PI * (j + 1) as f64 * day / period;
            features[[i, 2 * j]] = arg.sin();
            features[[i, 2 * j + 1]] = arg.cos();
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_layout() {
        let x = fourier_features(&[0.0, 1.75], 7.0, 2);
        assert_eq!(x.shape(), &[2, 4]);
        // day 0: sin = 0, cos = 1 for every harmonic
        assert_eq!(x[[0, 0]], 0.0);
        assert_eq!(x[[0, 1]], 1.0);
        assert_eq!(x[[0, 3]], 1.0);
        // quarter period: first harmonic sin = 1
        assert!((x[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_component_is_periodic() {
        let yearly = SeasonalityParams {
            name: "yearly".to_string(),
            period_days: 365.25,
            fourier_order: 2,
            mode: SeasonalityMode::Additive,
            coefficients: vec![0.3, -0.1, 0.05, 0.2],
        };
        let comp = yearly.component(&[10.0, 10.0 + 365.25]);
        assert!((comp[0] - comp[1]).abs() < 1e-9);
    }

    #[test]
    fn test_validate_coefficient_count() {
        let bad = SeasonalityParams {
            name: "weekly".to_string(),
            period_days: 7.0,
            fourier_order: 3,
            mode: SeasonalityMode::Additive,
            coefficients: vec![0.1; 5],
        };
        assert!(bad.validate().is_err());
    }
}
