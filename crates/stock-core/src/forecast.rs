//! 預測結果模型（預測引擎的輸出）

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::season::Season;

/// 預測結果（只新增，建立後不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// 結果ID
    pub id: Uuid,

    /// 執行ID（同一次批次的結果共用）
    pub run_id: Uuid,

    /// 物料代碼
    pub material_code: String,

    /// 日平均需求
    pub demand_mean: Decimal,

    /// 需求標準差
    pub demand_std_dev: Decimal,

    /// 補貨期（天）
    pub lead_time_days: u32,

    /// 建議安全庫存（>= 1）
    pub recommended_safety_stock: u32,

    /// 變異緩衝量（公式中的標準差項）
    pub safety_buffer: Decimal,

    /// 變異係數（σ / 平均）
    pub coefficient_of_variation: Decimal,

    /// 使用的日觀測數
    pub observation_count: usize,

    /// 使用的季節（None 表示未做季節篩選）
    pub season: Option<Season>,

    /// 方法描述（公式 + 回溯天數 + 季節）
    pub method: String,

    /// 方法名稱
    pub method_label: String,

    /// 計算時間
    pub computed_at: DateTime<Utc>,
}

impl ForecastResult {
    /// 結果所屬的庫存區間
    pub fn band(&self) -> StockBand {
        StockBand::of(self.recommended_safety_stock)
    }
}

/// 將統計值轉換為持久化用的兩位小數
pub fn persisted_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// 建議安全庫存的分佈區間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockBand {
    /// 1-10
    UpTo10,
    /// 11-30
    UpTo30,
    /// 31-60
    UpTo60,
    /// 61 以上
    Above60,
}

impl StockBand {
    pub const ALL: [StockBand; 4] = [
        StockBand::UpTo10,
        StockBand::UpTo30,
        StockBand::UpTo60,
        StockBand::Above60,
    ];

    pub fn of(quantity: u32) -> Self {
        match quantity {
            0..=10 => StockBand::UpTo10,
            11..=30 => StockBand::UpTo30,
            31..=60 => StockBand::UpTo60,
            _ => StockBand::Above60,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockBand::UpTo10 => "1-10",
            StockBand::UpTo30 => "11-30",
            StockBand::UpTo60 => "31-60",
            StockBand::Above60 => "61+",
        }
    }
}

impl fmt::Display for StockBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
