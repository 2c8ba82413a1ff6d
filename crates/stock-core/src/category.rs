//! 物料分類規則

use serde::{Deserialize, Serialize};

/// 物料等級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialClass {
    /// 關鍵物料（較長補貨期、較高庫存下限）
    Critical,
    /// 一般物料
    Standard,
}

impl MaterialClass {
    pub fn is_critical(&self) -> bool {
        *self == MaterialClass::Critical
    }
}

/// 分類規則：物料代碼前綴 → 物料等級
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// 代碼前綴（比對時不分大小寫）
    pub prefix: String,

    /// 命中時的物料等級
    pub class: MaterialClass,

    /// 說明
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryRule {
    /// 創建新的分類規則
    pub fn new(prefix: impl Into<String>, class: MaterialClass) -> Self {
        Self {
            prefix: prefix.into(),
            class,
            description: None,
        }
    }

    /// 建構器模式：設置說明
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 檢查物料代碼是否命中此規則
    pub fn matches(&self, code: &str) -> bool {
        code.to_uppercase().starts_with(&self.prefix.to_uppercase())
    }

    /// 預設關鍵物料規則：冷媒氣體、電纜、壓縮機
    pub fn default_critical_rules() -> Vec<CategoryRule> {
        vec![
            CategoryRule::new("GAS", MaterialClass::Critical).with_description("冷媒氣體"),
            CategoryRule::new("CAB", MaterialClass::Critical).with_description("電纜"),
            CategoryRule::new("COMP", MaterialClass::Critical).with_description("壓縮機"),
        ]
    }
}
