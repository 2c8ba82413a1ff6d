//! # Stock Core
//!
//! 臨界庫存預測引擎的核心資料模型與類型定義

pub mod category;
pub mod config;
pub mod demand;
pub mod forecast;
pub mod inventory;
pub mod season;
pub mod store;

// Re-export 主要類型
pub use category::{CategoryRule, MaterialClass};
pub use config::{
    FallbackStatistics, FloorPolicy, ForecastConfig, FormulaKind, LeadTimePolicy,
    RetentionPolicy, SeasonSelection, MAX_HISTORY_DAYS,
};
pub use demand::{
    DemandObservation, DemandRecord, DemandSourceKind, Movement, MovementKind, RequestLine,
    RequestStatus,
};
pub use forecast::{persisted_decimal, ForecastResult, StockBand};
pub use inventory::{InventoryRecord, Material, StockedMaterial};
pub use season::{Season, SeasonCalendar};
pub use store::{CommitReceipt, DemandSource, ForecastStore};

/// 預測引擎錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("配置解析失敗: {0}")]
    ConfigParse(String),

    #[error("儲存層錯誤: {0}")]
    Storage(String),

    #[error("找不到物料或其庫存記錄: {0}")]
    MaterialNotFound(String),

    #[error("無效的狀態: {0}")]
    InvalidState(String),

    #[error("工作執行緒池錯誤: {0}")]
    WorkerPool(String),
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
