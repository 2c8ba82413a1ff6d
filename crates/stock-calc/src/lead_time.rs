//! 補貨期估計
//!
//! 粗略的兩級啟發式：依物料代碼前綴判斷是否為關鍵物料，關鍵物料使用較長的
//! 補貨期。不從採購歷史推算實際補貨期。

use stock_core::{CategoryRule, ForecastConfig, LeadTimePolicy, MaterialClass};

/// 補貨期估計器
#[derive(Debug, Clone)]
pub struct LeadTimeEstimator {
    rules: Vec<CategoryRule>,
    policy: LeadTimePolicy,
}

impl LeadTimeEstimator {
    pub fn new(rules: Vec<CategoryRule>, policy: LeadTimePolicy) -> Self {
        Self { rules, policy }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(config.category_rules.clone(), config.lead_times)
    }

    /// 依規則表分類物料代碼，第一條命中的規則生效，沒有命中則為一般物料
    pub fn classify(&self, material_code: &str) -> MaterialClass {
        self.rules
            .iter()
            .find(|rule| rule.matches(material_code))
            .map(|rule| rule.class)
            .unwrap_or(MaterialClass::Standard)
    }

    pub fn is_critical_category(&self, material_code: &str) -> bool {
        self.classify(material_code).is_critical()
    }

    /// 估計補貨期（天）
    pub fn estimate(&self, class: MaterialClass) -> u32 {
        self.policy.days_for(class)
    }
}
