//! 再訂購點公式

use stock_core::{ForecastConfig, FormulaKind};

/// 公式參數（每次批次由配置解析一次）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaParameters {
    /// 服務水準對應的 z 值
    pub z_score: f64,
    /// 保守公式的覆蓋天數
    pub coverage_days: u32,
    /// 保守公式的標準差倍數
    pub sigma_multiplier: f64,
}

impl FormulaParameters {
    pub fn from_config(config: &ForecastConfig) -> stock_core::Result<Self> {
        Ok(Self {
            z_score: config.resolve_z_score()?,
            coverage_days: config.conservative_coverage_days,
            sigma_multiplier: config.conservative_sigma_multiplier,
        })
    }
}

impl Default for FormulaParameters {
    fn default() -> Self {
        Self {
            z_score: 1.65,
            coverage_days: 7,
            sigma_multiplier: 2.5,
        }
    }
}

/// 公式計算結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReorderPoint {
    /// 建議數量（無條件進位）
    pub recommendation: u32,
    /// 變異緩衝量（公式中的標準差項）
    pub safety_buffer: f64,
}

/// 再訂購點計算器
pub struct ReorderPointCalculator;

impl ReorderPointCalculator {
    /// 依公式類型計算
    pub fn apply(
        formula: FormulaKind,
        demand_mean: f64,
        demand_std_dev: f64,
        lead_time_days: u32,
        params: &FormulaParameters,
    ) -> ReorderPoint {
        match formula {
            FormulaKind::Standard => {
                Self::standard(demand_mean, demand_std_dev, lead_time_days, params.z_score)
            }
            FormulaKind::Conservative => Self::conservative(
                demand_mean,
                demand_std_dev,
                params.coverage_days,
                params.sigma_multiplier,
            ),
        }
    }

    /// 標準 ROP
    ///
    /// 安全庫存 = z × σ × √LT，建議量 = ⌈平均 × LT + 安全庫存⌉
    pub fn standard(demand_mean: f64, demand_std_dev: f64, lead_time_days: u32, z_score: f64) -> ReorderPoint {
        let lead_time = f64::from(lead_time_days);
        let safety_buffer = z_score * demand_std_dev * lead_time.sqrt();
        ReorderPoint {
            recommendation: ceil_quantity(demand_mean * lead_time + safety_buffer),
            safety_buffer,
        }
    }

    /// 保守公式：固定覆蓋天數加上固定倍數的標準差，與補貨期無關
    ///
    /// 建議量 = ⌈平均 × 覆蓋天數 + σ × 倍數⌉
    pub fn conservative(
        demand_mean: f64,
        demand_std_dev: f64,
        coverage_days: u32,
        sigma_multiplier: f64,
    ) -> ReorderPoint {
        let safety_buffer = demand_std_dev * sigma_multiplier;
        ReorderPoint {
            recommendation: ceil_quantity(demand_mean * f64::from(coverage_days) + safety_buffer),
            safety_buffer,
        }
    }
}

/// 無條件進位並轉為數量；負值與 NaN 視為 0
fn ceil_quantity(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        // `as` 在超出範圍時飽和
        value.ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_formula_reference_case() {
        // 10 × 14 + 1.65 × 3 × √14 = 140 + 18.52 → 159
        let rop = ReorderPointCalculator::standard(10.0, 3.0, 14, 1.65);

        assert_eq!(rop.recommendation, 159);
        assert!((rop.safety_buffer - 18.5212).abs() < 1e-3);
    }

    #[test]
    fn test_conservative_formula_reference_case() {
        // 10 × 7 + 3 × 2.5 = 77.5 → 78
        let rop = ReorderPointCalculator::conservative(10.0, 3.0, 7, 2.5);

        assert_eq!(rop.recommendation, 78);
        assert_eq!(rop.safety_buffer, 7.5);
    }

    #[test]
    fn test_conservative_ignores_lead_time() {
        let params = FormulaParameters::default();
        let short = ReorderPointCalculator::apply(FormulaKind::Conservative, 4.0, 1.0, 7, &params);
        let long = ReorderPointCalculator::apply(FormulaKind::Conservative, 4.0, 1.0, 14, &params);

        assert_eq!(short, long);
    }

    #[test]
    fn test_exact_integer_is_not_bumped() {
        let rop = ReorderPointCalculator::conservative(2.0, 0.0, 7, 2.5);
        assert_eq!(rop.recommendation, 14);
    }

    #[test]
    fn test_degenerate_values() {
        assert_eq!(ceil_quantity(-3.2), 0);
        assert_eq!(ceil_quantity(f64::NAN), 0);
        assert_eq!(ceil_quantity(0.01), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn standard_matches_closed_form(
            mean in 0.0f64..500.0,
            std in 0.0f64..200.0,
            lt in 1u32..60,
        ) {
            let expected = (mean * f64::from(lt) + 1.65 * std * f64::from(lt).sqrt()).ceil();
            let rop = ReorderPointCalculator::standard(mean, std, lt, 1.65);
            prop_assert_eq!(f64::from(rop.recommendation), expected);
        }

        #[test]
        fn conservative_matches_closed_form(
            mean in 0.0f64..500.0,
            std in 0.0f64..200.0,
        ) {
            let expected = (mean * 7.0 + std * 2.5).ceil();
            let rop = ReorderPointCalculator::conservative(mean, std, 7, 2.5);
            prop_assert_eq!(f64::from(rop.recommendation), expected);
        }
    }
}
