//! 物料與庫存模型

use serde::{Deserialize, Serialize};

/// 物料（對預測引擎而言唯讀）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// 物料代碼（唯一）
    pub code: String,

    /// 描述
    pub description: String,

    /// 分類
    pub category: Option<String>,
}

impl Material {
    /// 創建新的物料
    pub fn new(code: String, description: String) -> Self {
        Self {
            code,
            description,
            category: None,
        }
    }

    /// 建構器模式：設置分類
    pub fn with_category(mut self, category: String) -> Self {
        self.category = Some(category);
        self
    }
}

/// 庫存記錄（與物料一對一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 物料代碼
    pub material_code: String,

    /// 現有庫存
    pub current_stock: u32,

    /// 安全庫存（由預測引擎覆寫）
    pub safety_stock: u32,
}

impl InventoryRecord {
    /// 創建新的庫存記錄
    pub fn new(material_code: String, current_stock: u32, safety_stock: u32) -> Self {
        Self {
            material_code,
            current_stock,
            safety_stock,
        }
    }

    /// 檢查庫存是否低於安全庫存（臨界庫存）
    pub fn is_below_safety_stock(&self) -> bool {
        self.current_stock < self.safety_stock
    }

    /// 獲取需要補充的數量
    pub fn replenishment_needed(&self) -> u32 {
        self.safety_stock.saturating_sub(self.current_stock)
    }
}

/// 物料與其庫存記錄（批次的迭代單位）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockedMaterial {
    pub material: Material,
    pub inventory: InventoryRecord,
}

impl StockedMaterial {
    pub fn new(material: Material, inventory: InventoryRecord) -> Self {
        Self {
            material,
            inventory,
        }
    }

    pub fn code(&self) -> &str {
        &self.material.code
    }
}
