//! 單物料臨界庫存計算器

use chrono::{DateTime, Datelike, Utc};
use stock_core::{
    persisted_decimal, DemandObservation, ForecastConfig, ForecastResult, MaterialClass, Season,
};
use uuid::Uuid;

use crate::aggregation::HistoryWindow;
use crate::floor::FloorEnforcer;
use crate::lead_time::LeadTimeEstimator;
use crate::reorder::{FormulaParameters, ReorderPointCalculator};
use crate::seasonal::{SeasonalAdjustment, SeasonalClassifier};
use crate::statistics::{coefficient_of_variation, DemandStatistics};
use crate::ForecastWarning;

const FALLBACK_METHOD_LABEL: &str = "Default (no data)";

/// 一次執行的共用決策（季節只在執行開始時決定一次）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunPlan {
    /// 執行ID
    pub run_id: Uuid,

    /// 執行時間
    pub now: DateTime<Utc>,

    /// 使用的季節，None 表示不篩選（改用季節係數）
    pub season: Option<Season>,

    /// 回溯區間
    pub window: HistoryWindow,
}

impl RunPlan {
    pub fn new(config: &ForecastConfig, now: DateTime<Utc>) -> stock_core::Result<Self> {
        Ok(Self {
            run_id: Uuid::new_v4(),
            now,
            season: config.resolve_season(now.date_naive()),
            window: HistoryWindow::ending_at(now, config.history_days)?,
        })
    }

    pub fn season_label(&self) -> &'static str {
        self.season.map(|s| s.name()).unwrap_or("none")
    }
}

/// 單物料計算結果（尚未持久化）
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialForecast {
    pub material_code: String,
    pub class: MaterialClass,
    pub lead_time_days: u32,
    pub demand_mean: f64,
    pub demand_std_dev: f64,
    pub safety_buffer: f64,
    pub coefficient_of_variation: f64,
    /// 套用下限前的公式結果
    pub formula_recommendation: u32,
    /// 套用下限後的建議安全庫存
    pub recommendation: u32,
    pub observation_count: usize,
    pub adjustment: SeasonalAdjustment,
    pub used_fallback: bool,
    pub warnings: Vec<ForecastWarning>,
}

/// 臨界庫存計算器
///
/// 純計算，不做任何 I/O：輸入彙總後的需求序列，輸出統計與建議量。
#[derive(Debug, Clone)]
pub struct StockCalculator {
    config: ForecastConfig,
    params: FormulaParameters,
    estimator: LeadTimeEstimator,
    seasonal: SeasonalClassifier,
    floor: FloorEnforcer,
}

impl StockCalculator {
    /// 創建計算器，配置無效時立即失敗
    pub fn new(config: ForecastConfig) -> stock_core::Result<Self> {
        config.validate()?;
        let params = FormulaParameters::from_config(&config)?;

        Ok(Self {
            params,
            estimator: LeadTimeEstimator::from_config(&config),
            seasonal: SeasonalClassifier::new(config.calendar.clone()),
            floor: FloorEnforcer::new(config.floors),
            config,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn parameters(&self) -> &FormulaParameters {
        &self.params
    }

    pub fn estimator(&self) -> &LeadTimeEstimator {
        &self.estimator
    }

    /// 計算單一物料的建議安全庫存
    pub fn calculate(
        &self,
        material_code: &str,
        history: &[DemandObservation],
        plan: &RunPlan,
    ) -> MaterialForecast {
        let class = self.estimator.classify(material_code);
        let lead_time_days = self.estimator.estimate(class);

        // 篩選模式
        let (series, adjustment) = match plan.season {
            Some(season) => (
                self.seasonal.filter(history, season),
                SeasonalAdjustment::Filtered(season),
            ),
            None => (history.to_vec(), SeasonalAdjustment::None),
        };

        if series.len() < self.config.min_observations {
            return self.fallback(material_code, class, lead_time_days, series.len(), adjustment);
        }

        let mut warnings = Vec::new();
        let stats = DemandStatistics::from_observations(&series);
        let dispersion = stats.dispersion(self.config.dispersion_fallback_ratio);
        if dispersion.is_synthesized() {
            tracing::debug!(
                "物料 {} 標準差無法定義，改用平均值 × {}",
                material_code,
                self.config.dispersion_fallback_ratio
            );
            warnings.push(ForecastWarning::undefined_dispersion(
                material_code,
                dispersion.value(),
            ));
        }
        let std_dev = dispersion.value();
        let cv = coefficient_of_variation(stats.mean, std_dev);

        // 係數模式（只在未篩選季節時使用），參考月份取執行時間的月份
        let (demand_mean, adjustment) = if plan.season.is_none() {
            let factor = self.seasonal.factor(
                &series,
                plan.now.month(),
                self.config.seasonal_factor_min_observations,
                self.config.seasonal_factor_bounds,
            );
            tracing::debug!("物料 {} 季節係數: {:.2}", material_code, factor);
            (stats.mean * factor, SeasonalAdjustment::Factor(factor))
        } else {
            (stats.mean, adjustment)
        };

        let rop = ReorderPointCalculator::apply(
            self.config.formula,
            demand_mean,
            std_dev,
            lead_time_days,
            &self.params,
        );
        let recommendation = self.floor.enforce(rop.recommendation, class);

        tracing::debug!(
            "物料 {}: 平均 {:.2}, σ {:.2}, LT {} 天, 公式 {} → {}",
            material_code,
            demand_mean,
            std_dev,
            lead_time_days,
            rop.recommendation,
            recommendation
        );

        MaterialForecast {
            material_code: material_code.to_string(),
            class,
            lead_time_days,
            demand_mean,
            demand_std_dev: std_dev,
            safety_buffer: rop.safety_buffer,
            coefficient_of_variation: cv,
            formula_recommendation: rop.recommendation,
            recommendation,
            observation_count: series.len(),
            adjustment,
            used_fallback: false,
            warnings,
        }
    }

    /// 歷史不足：直接使用預設統計與預設建議量，不跑公式
    fn fallback(
        &self,
        material_code: &str,
        class: MaterialClass,
        lead_time_days: u32,
        observation_count: usize,
        adjustment: SeasonalAdjustment,
    ) -> MaterialForecast {
        tracing::warn!(
            "物料 {} 資料不足（{} 筆），使用預設值",
            material_code,
            observation_count
        );

        let fallback = self.config.fallback;
        MaterialForecast {
            material_code: material_code.to_string(),
            class,
            lead_time_days,
            demand_mean: fallback.demand_mean,
            demand_std_dev: fallback.demand_std_dev,
            safety_buffer: 0.0,
            coefficient_of_variation: 0.0,
            formula_recommendation: fallback.recommendation,
            recommendation: self.floor.enforce(fallback.recommendation, class),
            observation_count,
            adjustment,
            used_fallback: true,
            warnings: vec![ForecastWarning::insufficient_history(
                material_code,
                observation_count,
                self.config.min_observations,
            )],
        }
    }

    /// 方法描述，例如 `F:Std | Hist:180d | Est:Winter`
    pub fn method_descriptor(&self, plan: &RunPlan) -> String {
        format!(
            "F:{} | Hist:{}d | Est:{}",
            self.config.formula.short_code(),
            self.config.history_days,
            plan.season_label()
        )
    }

    /// 轉換為待持久化的預測結果
    pub fn to_result(&self, forecast: &MaterialForecast, plan: &RunPlan) -> ForecastResult {
        let method_label = if forecast.used_fallback {
            FALLBACK_METHOD_LABEL
        } else {
            self.config.formula.label()
        };

        ForecastResult {
            id: Uuid::new_v4(),
            run_id: plan.run_id,
            material_code: forecast.material_code.clone(),
            demand_mean: persisted_decimal(forecast.demand_mean),
            demand_std_dev: persisted_decimal(forecast.demand_std_dev),
            lead_time_days: forecast.lead_time_days,
            recommended_safety_stock: forecast.recommendation,
            safety_buffer: persisted_decimal(forecast.safety_buffer),
            coefficient_of_variation: persisted_decimal(forecast.coefficient_of_variation),
            observation_count: forecast.observation_count,
            season: plan.season,
            method: self.method_descriptor(plan),
            method_label: method_label.to_string(),
            computed_at: plan.now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WarningKind;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use stock_core::{FormulaKind, SeasonSelection};

    fn plan_for(config: &ForecastConfig, y: i32, m: u32, d: u32) -> RunPlan {
        RunPlan::new(config, Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()).unwrap()
    }

    fn daily(start: NaiveDate, quantities: &[i64]) -> Vec<DemandObservation> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, q)| {
                DemandObservation::new(
                    start + chrono::Duration::days(i as i64),
                    Decimal::from(*q),
                )
            })
            .collect()
    }

    #[test]
    fn test_fallback_with_no_history() {
        let config = ForecastConfig::default().with_formula(FormulaKind::Standard);
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 1);

        let forecast = calculator.calculate("VALV-01", &[], &plan);

        assert!(forecast.used_fallback);
        assert_eq!(forecast.demand_mean, 5.0);
        assert_eq!(forecast.demand_std_dev, 2.0);
        assert_eq!(forecast.formula_recommendation, 20);
        assert_eq!(forecast.recommendation, 20);
        assert_eq!(forecast.lead_time_days, 7);
        assert_eq!(forecast.warnings[0].kind, WarningKind::InsufficientHistory);

        let result = calculator.to_result(&forecast, &plan);
        assert_eq!(result.method_label, "Default (no data)");
        assert_eq!(result.safety_buffer, Decimal::ZERO);
    }

    #[test]
    fn test_fallback_for_critical_keeps_longer_lead_time() {
        let config = ForecastConfig::default();
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 1);

        let forecast = calculator.calculate("GAS001", &[], &plan);

        assert_eq!(forecast.class, MaterialClass::Critical);
        assert_eq!(forecast.lead_time_days, 14);
        assert_eq!(forecast.recommendation, 20);
    }

    #[test]
    fn test_fallback_floor_binds_for_custom_default() {
        let config = ForecastConfig::default().with_fallback(stock_core::FallbackStatistics {
            demand_mean: 1.0,
            demand_std_dev: 0.5,
            recommendation: 4,
        });
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 1);

        assert_eq!(calculator.calculate("CAB-01", &[], &plan).recommendation, 10);
        assert_eq!(calculator.calculate("TAPE-01", &[], &plan).recommendation, 4);
    }

    #[test]
    fn test_constant_demand_synthesizes_dispersion() {
        let config = ForecastConfig::default()
            .with_formula(FormulaKind::Standard)
            .with_season(SeasonSelection::Fixed(Season::Winter));
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 31);
        let history = daily(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), &[10; 10]);

        let forecast = calculator.calculate("VALV-01", &history, &plan);

        // σ = 10 × 0.3 = 3；10 × 7 + 1.65 × 3 × √7 = 83.1 → 84
        assert!(!forecast.used_fallback);
        assert!((forecast.demand_std_dev - 3.0).abs() < 1e-9);
        assert_eq!(forecast.recommendation, 84);
        assert_eq!(forecast.warnings.len(), 1);
        assert_eq!(forecast.warnings[0].kind, WarningKind::UndefinedDispersion);
    }

    #[test]
    fn test_season_filter_applies_before_threshold() {
        let config = ForecastConfig::default().with_season(SeasonSelection::Fixed(Season::Summer));
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 31);
        // 全部落在冬季（7 月），夏季篩選後為空
        let history = daily(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), &[4; 20]);

        let forecast = calculator.calculate("VALV-01", &history, &plan);

        assert!(forecast.used_fallback);
        assert_eq!(forecast.observation_count, 0);
        assert_eq!(forecast.adjustment, SeasonalAdjustment::Filtered(Season::Summer));
    }

    #[test]
    fn test_factor_mode_when_season_disabled() {
        let config = ForecastConfig::default().with_season(SeasonSelection::Disabled);
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 31);
        // 少於 30 筆 → 係數為 1
        let history = daily(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            &[8, 12, 8, 12, 8, 12, 8, 12],
        );

        let forecast = calculator.calculate("VALV-01", &history, &plan);

        assert_eq!(forecast.adjustment, SeasonalAdjustment::Factor(1.0));
        assert_eq!(forecast.demand_mean, 10.0);
        // 保守：10 × 7 + σ × 2.5
        let expected = (70.0 + forecast.demand_std_dev * 2.5).ceil() as u32;
        assert_eq!(forecast.recommendation, expected);

        let result = calculator.to_result(&forecast, &plan);
        assert_eq!(result.method, "F:Cons | Hist:180d | Est:none");
        assert_eq!(result.season, None);
    }

    #[test]
    fn test_factor_mode_scales_mean() {
        let config = ForecastConfig::default().with_season(SeasonSelection::Disabled);
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 31);
        // 6 月每日 10、7 月每日 20（各 20 筆）→ 7 月係數 = 20 / 15
        let mut history = daily(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &[10; 20]);
        history.extend(daily(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), &[20; 20]));

        let forecast = calculator.calculate("VALV-01", &history, &plan);

        match forecast.adjustment {
            SeasonalAdjustment::Factor(f) => assert!((f - 20.0 / 15.0).abs() < 1e-12),
            other => panic!("unexpected adjustment: {other:?}"),
        }
        assert!((forecast.demand_mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_method_descriptor_with_season() {
        let config = ForecastConfig::default()
            .with_formula(FormulaKind::Standard)
            .with_history_days(90);
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 1, 15);

        assert_eq!(plan.season, Some(Season::Summer));
        assert_eq!(calculator.method_descriptor(&plan), "F:Std | Hist:90d | Est:Summer");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ForecastConfig::default().with_history_days(0);
        assert!(StockCalculator::new(config).is_err());
    }

    #[test]
    fn test_custom_lead_time_policy() {
        let config = ForecastConfig::default().with_lead_times(stock_core::LeadTimePolicy {
            critical_days: 21,
            standard_days: 3,
        });
        let calculator = StockCalculator::new(config.clone()).unwrap();
        let plan = plan_for(&config, 2025, 7, 31);

        assert_eq!(calculator.calculate("GAS001", &[], &plan).lead_time_days, 21);
        assert_eq!(calculator.calculate("TAPE-01", &[], &plan).lead_time_days, 3);
    }

    #[test]
    fn test_plan_rejects_window_before_representable_dates() {
        let config = ForecastConfig::default();
        let now = DateTime::<Utc>::MIN_UTC + chrono::Duration::days(30);

        assert!(matches!(
            RunPlan::new(&config, now),
            Err(stock_core::ForecastError::InvalidConfig(_))
        ));
    }
}
