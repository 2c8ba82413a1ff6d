//! 需求統計

use rust_decimal::prelude::ToPrimitive;
use stock_core::DemandObservation;

/// 日需求的平均值與樣本標準差
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandStatistics {
    /// 觀測數
    pub count: usize,

    /// 平均值
    pub mean: f64,

    /// 樣本標準差（n - 1），少於 2 筆觀測時為 None
    pub std_dev: Option<f64>,
}

impl DemandStatistics {
    pub fn from_observations(observations: &[DemandObservation]) -> Self {
        let values: Vec<f64> = observations
            .iter()
            .map(|o| o.quantity.to_f64().unwrap_or(0.0))
            .collect();
        Self::from_values(&values)
    }

    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                std_dev: None,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            None
        } else {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            Some((sum_sq / (count - 1) as f64).sqrt())
        };

        Self {
            count,
            mean,
            std_dev,
        }
    }

    /// 可用於公式的離散度
    ///
    /// 標準差為零、NaN 或無法定義時，以 `mean * fallback_ratio` 代替，
    /// 避免歷史稀疏時安全緩衝變成零。
    pub fn dispersion(&self, fallback_ratio: f64) -> Dispersion {
        match self.std_dev {
            Some(sd) if sd.is_finite() && sd > 0.0 => Dispersion::Observed(sd),
            _ => Dispersion::Synthesized(self.mean * fallback_ratio),
        }
    }
}

/// 離散度
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispersion {
    /// 實際計算出的標準差
    Observed(f64),
    /// 以平均值比例合成
    Synthesized(f64),
}

impl Dispersion {
    pub fn value(&self) -> f64 {
        match self {
            Dispersion::Observed(v) | Dispersion::Synthesized(v) => *v,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, Dispersion::Synthesized(_))
    }
}

/// 變異係數（σ / 平均），平均為零時回傳 0
pub fn coefficient_of_variation(mean: f64, std_dev: f64) -> f64 {
    if mean > 0.0 {
        std_dev / mean
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std_dev() {
        let stats = DemandStatistics::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        // 樣本變異數 = 32 / 7
        assert!((stats.std_dev.unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(!stats.dispersion(0.3).is_synthesized());
    }

    #[test]
    fn test_single_observation_has_no_std_dev() {
        let stats = DemandStatistics::from_values(&[4.0]);
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.dispersion(0.3), Dispersion::Synthesized(4.0 * 0.3));
    }

    #[test]
    fn test_constant_series_synthesizes_dispersion() {
        let stats = DemandStatistics::from_values(&[10.0; 9]);
        assert_eq!(stats.std_dev, Some(0.0));

        let dispersion = stats.dispersion(0.3);
        assert!(dispersion.is_synthesized());
        assert!((dispersion.value() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_series() {
        let stats = DemandStatistics::from_values(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.dispersion(0.3).value(), 0.0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(10.0, 3.0), 0.3);
        assert_eq!(coefficient_of_variation(0.0, 3.0), 0.0);
    }
}
