//! 預測引擎配置模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::category::{CategoryRule, MaterialClass};
use crate::season::{Season, SeasonCalendar};
use crate::{ForecastError, Result};

/// 服務水準 → z 值對照表（常用教科書數值）
/// 歷史回溯天數上限
pub const MAX_HISTORY_DAYS: u32 = 3_650;

const SERVICE_LEVEL_Z_TABLE: [(f64, f64); 8] = [
    (0.80, 0.84),
    (0.85, 1.04),
    (0.90, 1.28),
    (0.95, 1.65),
    (0.975, 1.96),
    (0.98, 2.05),
    (0.99, 2.33),
    (0.995, 2.58),
];

/// 預測引擎配置
///
/// 所有原本寫死的常數（z 值、季節對照、關鍵物料前綴、下限）都集中在這裡，
/// 測試可以替換成其他日曆或門檻。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// 再訂購點公式
    pub formula: FormulaKind,

    /// 季節選擇
    pub season: SeasonSelection,

    /// 歷史回溯天數
    pub history_days: u32,

    /// 服務水準
    pub service_level: f64,

    /// 明確指定的 z 值（優先於服務水準對照）
    pub z_score: Option<f64>,

    /// 使用真實統計所需的最少日觀測數
    pub min_observations: usize,

    /// 計算季節係數所需的最少觀測數
    pub seasonal_factor_min_observations: usize,

    /// 季節係數上下限
    pub seasonal_factor_bounds: (f64, f64),

    /// 標準差無法定義時以平均值乘此比例代替
    pub dispersion_fallback_ratio: f64,

    /// 保守公式的覆蓋天數
    pub conservative_coverage_days: u32,

    /// 保守公式的標準差倍數
    pub conservative_sigma_multiplier: f64,

    /// 歷史不足時的預設統計
    pub fallback: FallbackStatistics,

    /// 補貨期政策
    pub lead_times: LeadTimePolicy,

    /// 庫存下限政策
    pub floors: FloorPolicy,

    /// 物料分類規則
    pub category_rules: Vec<CategoryRule>,

    /// 季節日曆
    pub calendar: SeasonCalendar,

    /// 歷史結果保留政策
    pub retention: RetentionPolicy,

    /// 工作執行緒數量（1 = 循序執行）
    pub workers: usize,
}

impl ForecastConfig {
    /// 建構器模式：設置公式
    pub fn with_formula(mut self, formula: FormulaKind) -> Self {
        self.formula = formula;
        self
    }

    /// 建構器模式：設置季節選擇
    pub fn with_season(mut self, season: SeasonSelection) -> Self {
        self.season = season;
        self
    }

    /// 建構器模式：設置回溯天數
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    /// 建構器模式：設置服務水準
    pub fn with_service_level(mut self, service_level: f64) -> Self {
        self.service_level = service_level;
        self
    }

    /// 建構器模式：直接指定 z 值
    pub fn with_z_score(mut self, z: f64) -> Self {
        self.z_score = Some(z);
        self
    }

    /// 建構器模式：設置分類規則
    pub fn with_category_rules(mut self, rules: Vec<CategoryRule>) -> Self {
        self.category_rules = rules;
        self
    }

    /// 建構器模式：設置季節日曆
    pub fn with_calendar(mut self, calendar: SeasonCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// 建構器模式：設置保留政策
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// 建構器模式：設置工作執行緒數量
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// 建構器模式：設置補貨期政策
    pub fn with_lead_times(mut self, lead_times: LeadTimePolicy) -> Self {
        self.lead_times = lead_times;
        self
    }

    /// 建構器模式：設置庫存下限政策
    pub fn with_floors(mut self, floors: FloorPolicy) -> Self {
        self.floors = floors;
        self
    }

    /// 建構器模式：設置預設統計
    pub fn with_fallback(mut self, fallback: FallbackStatistics) -> Self {
        self.fallback = fallback;
        self
    }

    /// 從 JSON 文件載入配置，缺少的欄位使用預設值
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ForecastConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 取得 z 值
    ///
    /// 明確指定的 z 值優先；否則依服務水準查表，表內相鄰點之間線性內插。
    pub fn resolve_z_score(&self) -> Result<f64> {
        if let Some(z) = self.z_score {
            return Ok(z);
        }

        let level = self.service_level;
        if let Some((_, z)) = SERVICE_LEVEL_Z_TABLE
            .iter()
            .find(|(l, _)| (l - level).abs() < 1e-9)
        {
            return Ok(*z);
        }

        SERVICE_LEVEL_Z_TABLE
            .windows(2)
            .find(|w| w[0].0 < level && level < w[1].0)
            .map(|w| {
                let (lo, hi) = (w[0], w[1]);
                lo.1 + (level - lo.0) / (hi.0 - lo.0) * (hi.1 - lo.1)
            })
            .ok_or_else(|| {
                ForecastError::InvalidConfig(format!(
                    "服務水準 {} 超出支援範圍 [{}, {}]",
                    level,
                    SERVICE_LEVEL_Z_TABLE[0].0,
                    SERVICE_LEVEL_Z_TABLE[SERVICE_LEVEL_Z_TABLE.len() - 1].0
                ))
            })
    }

    /// 驗證配置（批次開始前呼叫，任何錯誤都會中止整個批次）
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidConfig(msg));

        if self.history_days == 0 || self.history_days > MAX_HISTORY_DAYS {
            return invalid(format!(
                "歷史回溯天數必須介於 1 與 {MAX_HISTORY_DAYS} 之間: {}",
                self.history_days
            ));
        }
        if let Some(z) = self.z_score {
            if !z.is_finite() || z <= 0.0 {
                return invalid(format!("z 值必須為正數: {z}"));
            }
        } else {
            self.resolve_z_score()?;
        }
        if self.min_observations < 2 {
            return invalid(format!("最少觀測數必須 >= 2: {}", self.min_observations));
        }
        let (lower, upper) = self.seasonal_factor_bounds;
        if !(lower > 0.0 && lower <= upper && upper.is_finite()) {
            return invalid(format!("季節係數上下限無效: [{lower}, {upper}]"));
        }
        if !(self.dispersion_fallback_ratio >= 0.0 && self.dispersion_fallback_ratio.is_finite()) {
            return invalid(format!(
                "標準差替代比例無效: {}",
                self.dispersion_fallback_ratio
            ));
        }
        if self.conservative_coverage_days == 0 {
            return invalid("保守公式覆蓋天數必須大於 0".to_string());
        }
        if !(self.conservative_sigma_multiplier >= 0.0
            && self.conservative_sigma_multiplier.is_finite())
        {
            return invalid(format!(
                "保守公式標準差倍數無效: {}",
                self.conservative_sigma_multiplier
            ));
        }
        if self.lead_times.critical_days == 0 || self.lead_times.standard_days == 0 {
            return invalid("補貨期必須大於 0".to_string());
        }
        if self.floors.critical == 0 || self.floors.standard == 0 {
            return invalid("庫存下限必須 >= 1".to_string());
        }
        if self.category_rules.iter().any(|r| r.prefix.trim().is_empty()) {
            return invalid("分類規則前綴不可為空".to_string());
        }
        if self.workers == 0 {
            return invalid("工作執行緒數量必須 >= 1".to_string());
        }

        Ok(())
    }

    /// 本次執行使用的季節（每次批次只決定一次）
    pub fn resolve_season(&self, today: NaiveDate) -> Option<Season> {
        self.season.resolve(&self.calendar, today)
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            formula: FormulaKind::Conservative,
            season: SeasonSelection::Auto,
            history_days: 180,
            service_level: 0.95,
            z_score: None,
            min_observations: 7,
            seasonal_factor_min_observations: 30,
            seasonal_factor_bounds: (0.5, 2.5),
            dispersion_fallback_ratio: 0.3,
            conservative_coverage_days: 7,
            conservative_sigma_multiplier: 2.5,
            fallback: FallbackStatistics::default(),
            lead_times: LeadTimePolicy::default(),
            floors: FloorPolicy::default(),
            category_rules: CategoryRule::default_critical_rules(),
            calendar: SeasonCalendar::default(),
            retention: RetentionPolicy::KeepHistory,
            workers: 1,
        }
    }
}

/// 再訂購點公式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormulaKind {
    /// 保守公式：平均 × 7 天 + 2.5σ（批次預設）
    #[default]
    Conservative,
    /// 標準 ROP：平均 × LT + z·σ·√LT
    Standard,
}

impl FormulaKind {
    /// 方法描述用的短代碼
    pub fn short_code(&self) -> &'static str {
        match self {
            FormulaKind::Conservative => "Cons",
            FormulaKind::Standard => "Std",
        }
    }

    /// 人類可讀名稱
    pub fn label(&self) -> &'static str {
        match self {
            FormulaKind::Conservative => "Conservative (7d + 2.5σ)",
            FormulaKind::Standard => "Standard ROP",
        }
    }
}

impl FromStr for FormulaKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conservative" | "conservadora" => Ok(FormulaKind::Conservative),
            "standard" | "estandar" | "estándar" | "rop" => Ok(FormulaKind::Standard),
            other => Err(ForecastError::InvalidConfig(format!("未知的公式: {other}"))),
        }
    }
}

/// 季節選擇
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeasonSelection {
    /// 依執行當下日期自動偵測
    #[default]
    Auto,
    /// 指定季節
    Fixed(Season),
    /// 不做季節篩選（改用季節係數）
    Disabled,
}

impl SeasonSelection {
    /// 從呼叫端參數解析；未指定表示自動偵測
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(|s| s.trim().to_lowercase()) {
            None => Ok(SeasonSelection::Auto),
            Some(s) if s == "auto" => Ok(SeasonSelection::Auto),
            Some(s) if s == "none" || s == "sin-estacion" => Ok(SeasonSelection::Disabled),
            Some(s) => s.parse::<Season>().map(SeasonSelection::Fixed),
        }
    }

    /// 解析出實際使用的季節：指定 > 自動偵測 > 不篩選
    pub fn resolve(&self, calendar: &SeasonCalendar, today: NaiveDate) -> Option<Season> {
        match self {
            SeasonSelection::Auto => Some(calendar.season_of_date(today)),
            SeasonSelection::Fixed(season) => Some(*season),
            SeasonSelection::Disabled => None,
        }
    }
}

/// 歷史不足時使用的預設統計
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackStatistics {
    pub demand_mean: f64,
    pub demand_std_dev: f64,
    pub recommendation: u32,
}

impl Default for FallbackStatistics {
    fn default() -> Self {
        Self {
            demand_mean: 5.0,
            demand_std_dev: 2.0,
            recommendation: 20,
        }
    }
}

/// 補貨期政策（粗略的兩級估計，非由採購歷史推算）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTimePolicy {
    pub critical_days: u32,
    pub standard_days: u32,
}

impl LeadTimePolicy {
    pub fn days_for(&self, class: MaterialClass) -> u32 {
        match class {
            MaterialClass::Critical => self.critical_days,
            MaterialClass::Standard => self.standard_days,
        }
    }
}

impl Default for LeadTimePolicy {
    fn default() -> Self {
        Self {
            critical_days: 14,
            standard_days: 7,
        }
    }
}

/// 庫存下限政策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPolicy {
    pub critical: u32,
    pub standard: u32,
}

impl FloorPolicy {
    pub fn floor_for(&self, class: MaterialClass) -> u32 {
        match class {
            MaterialClass::Critical => self.critical,
            MaterialClass::Standard => self.standard,
        }
    }
}

impl Default for FloorPolicy {
    fn default() -> Self {
        Self {
            critical: 10,
            standard: 1,
        }
    }
}

/// 歷史結果保留政策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// 保留所有歷史結果，以執行ID區分世代
    #[default]
    KeepHistory,
    /// 執行前刪除所有舊結果（完整刷新）
    PurgeBeforeRun,
}
